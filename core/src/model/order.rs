use crate::internal::*;
use crate::model::{Node, TypedModel};
use bit_set::BitSet;

/// Order of the nodes the model outputs depend on, inputs first.
pub fn eval_order(model: &TypedModel) -> ConvPadResult<Vec<usize>> {
    let inputs = model.input_outlets()?.iter().map(|n| n.node).collect::<Vec<usize>>();
    let targets = model.output_outlets()?.iter().map(|n| n.node).collect::<Vec<usize>>();
    eval_order_for_nodes(model.nodes(), &inputs, &targets)
}

/// Find a topological order of the nodes `targets` depend on.
///
/// Fails if the dependencies form a cycle.
pub fn eval_order_for_nodes(
    nodes: &[Node],
    inputs: &[usize],
    targets: &[usize],
) -> ConvPadResult<Vec<usize>> {
    let mut done = BitSet::with_capacity(nodes.len());
    let mut pending = BitSet::with_capacity(nodes.len());
    let mut needed: Vec<usize> = vec![];
    let mut order: Vec<usize> = vec![];
    for &t in targets {
        ensure!(t < nodes.len(), "Target node #{} is not in the model", t);
        needed.push(t);
    }
    while let Some(&node) = needed.last() {
        if done.contains(node) {
            needed.pop();
            continue;
        }
        if inputs.contains(&node) || nodes[node].inputs.iter().all(|i| done.contains(i.node)) {
            order.push(node);
            needed.pop();
            done.insert(node);
            pending.remove(node);
        } else {
            if !pending.insert(node) {
                bail!("Loop detected in graph around {}", nodes[node]);
            }
            for input in nodes[node].inputs.iter().rev() {
                if !done.contains(input.node) {
                    needed.push(input.node);
                }
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::array::StridedSlice;

    fn slice(model: &mut TypedModel, name: &str, input: OutletId) -> OutletId {
        let begin = model.add_const(format!("{name}.begin"), rctensor1(&[0i64])).unwrap();
        let end = model.add_const(format!("{name}.end"), rctensor1(&[2i64])).unwrap();
        model.wire_node(name, StridedSlice::new(0, 0), &[input, begin, end]).unwrap()[0]
    }

    #[test]
    fn simple() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [4usize])).unwrap();
        let s = slice(&mut model, "s", a);
        model.set_output_outlets(&[s]).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn unreachable_nodes_are_skipped() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [4usize])).unwrap();
        let s = slice(&mut model, "s", a);
        let _dead = slice(&mut model, "dead", a);
        model.set_output_outlets(&[s]).unwrap();
        assert_eq!(model.eval_order().unwrap().len(), 4);
    }

    #[test]
    fn cycle_is_an_error() {
        let mut model = TypedModel::default();
        let a = model.add_source("a", TypedFact::dt_shape(DatumType::F32, [4usize])).unwrap();
        let s1 = slice(&mut model, "s1", a);
        let s2 = slice(&mut model, "s2", s1);
        model.add_edge(s2, InletId::new(s1.node, 0)).unwrap();
        model.set_output_outlets(&[s2]).unwrap();
        assert!(model.eval_order().is_err());
    }
}
