use crate::internal::*;
use crate::model::{InletId, OutletId, TypedModel};

/// Rebuild `old` keeping only the nodes its outputs depend on, in evaluation
/// order. Model inputs are kept even when nothing consumes them.
pub fn compact(old: &TypedModel) -> ConvPadResult<TypedModel> {
    let mut new = TypedModel::default();
    let mut map: HashMap<OutletId, OutletId> = HashMap::new();
    for old_id in old.eval_order()? {
        let old_node = old.node(old_id);
        let facts = old_node.outputs.iter().map(|o| o.fact.clone()).collect();
        let new_id = new.add_node(old_node.name.clone(), old_node.op.clone(), facts)?;
        new.node_mut(new_id).rt_info = old_node.rt_info.clone();
        for ix in 0..old_node.outputs.len() {
            map.insert(OutletId::new(old_id, ix), OutletId::new(new_id, ix));
        }
        if old.input_outlets()?.contains(&OutletId::new(old_node.id, 0)) {
            continue;
        }
        for (ix, input) in old_node.inputs.iter().enumerate() {
            let mapped = map
                .get(input)
                .with_context(|| format!("Compacting {old_node}: input {input:?} not translated"))?;
            new.add_edge(*mapped, InletId::new(new_id, ix))?;
        }
    }
    for i in old.input_outlets()? {
        if !map.contains_key(i) {
            let node = old.node(i.node);
            trace!("Keeping unused source {node}");
            let new_id = new.add_node(
                node.name.clone(),
                node.op.clone(),
                tvec!(node.outputs[0].fact.clone()),
            )?;
            map.insert(*i, new_id.into());
        }
    }
    new.inputs = old.input_outlets()?.iter().map(|i| map[i]).collect();
    new.outputs = old.output_outlets()?.iter().map(|o| map[o]).collect();
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::array::StridedSlice;

    #[test]
    fn drops_dead_nodes_and_keeps_names() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [4usize])).unwrap();
        let unused = model.add_source("unused", TypedFact::dt_scalar(DatumType::I64)).unwrap();
        let dead = model.add_const("dead", rctensor0(1.0f32)).unwrap();
        let begin = model.add_const("begin", rctensor1(&[1i64])).unwrap();
        let end = model.add_const("end", rctensor1(&[3i64])).unwrap();
        let s = model.wire_node("s", StridedSlice::new(0, 0), &[a, begin, end]).unwrap()[0];
        model.node_mut(s.node).rt_info.insert("origin", "s");
        model.set_output_outlets(&[s]).unwrap();
        assert_eq!(model.nodes().len(), 6);

        model.compact().unwrap();
        assert_eq!(model.nodes().len(), 5);
        assert!(model.node_by_name("dead").is_err());
        assert_eq!(model.input_outlets().unwrap().len(), 2);
        assert_eq!(model.node(model.input_outlets().unwrap()[1].node).name, "unused");
        let s = model.node_by_name("s").unwrap();
        assert_eq!(s.rt_info.get("origin"), Some("s"));
        assert_eq!(model.output_outlets().unwrap(), &[OutletId::new(s.id, 0)]);
        let _ = (unused, dead);
        model.check_consistency().unwrap();
    }
}
