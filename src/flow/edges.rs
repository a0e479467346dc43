//! Edge selector and comparison evaluator (§4.2, §4.4)

use crate::flow::model::{ComparisonOp, EdgeSpec, OperandType};
use crate::flow::store::VariableStore;

/// Walk `edges` in declaration order and return the `target_id` of the first
/// matching EdgeSpec, or `None` for a dead end.
pub fn select_edge(edges: &[EdgeSpec], token: &str, store: &VariableStore) -> Option<i64> {
    edges.iter().find_map(|edge| {
        if let Some(keys) = &edge.input_keys {
            return (keys == token).then_some(edge.target_id);
        }
        if edge.apply_comparison {
            return evaluate_comparison(edge, store).then_some(edge.target_id);
        }
        if edge.is_catch_all() {
            return Some(edge.target_id);
        }
        None
    })
}

/// Evaluate `edge`'s comparison against the store. Returns `false` — never
/// panics or raises — on malformed operands (§4.4).
fn evaluate_comparison(edge: &EdgeSpec, store: &VariableStore) -> bool {
    let Some(operator) = edge.operator else {
        return false;
    };

    let lhs = match edge.operand_type {
        Some(OperandType::Tag) => edge
            .collection_tag
            .as_deref()
            .and_then(|tag| store.get(tag))
            .unwrap_or("")
            .to_string(),
        Some(OperandType::Literal) | None => edge.collection_tag.clone().unwrap_or_default(),
    };
    let v1 = edge.value1.as_deref().unwrap_or("");
    let v2 = edge.value2.as_deref();

    apply_comparison(operator, &lhs, v1, v2)
}

pub fn apply_comparison(operator: ComparisonOp, lhs: &str, v1: &str, v2: Option<&str>) -> bool {
    match operator {
        ComparisonOp::Eq => lhs == v1,
        ComparisonOp::Ne => lhs != v1,
        ComparisonOp::Grt => numeric(lhs, v1).is_some_and(|(a, b)| a > b),
        ComparisonOp::Lst => numeric(lhs, v1).is_some_and(|(a, b)| a < b),
        ComparisonOp::Gte => numeric(lhs, v1).is_some_and(|(a, b)| a >= b),
        ComparisonOp::Lte => numeric(lhs, v1).is_some_and(|(a, b)| a <= b),
        ComparisonOp::Ibw => {
            let Some(v2) = v2 else { return false };
            match (lhs.trim().parse::<f64>(), v1.trim().parse::<f64>(), v2.trim().parse::<f64>()) {
                (Ok(x), Ok(lo), Ok(hi)) => lo <= x && x <= hi,
                _ => false,
            }
        }
        ComparisonOp::Obw => {
            let Some(v2) = v2 else { return false };
            match (lhs.trim().parse::<f64>(), v1.trim().parse::<f64>(), v2.trim().parse::<f64>()) {
                (Ok(x), Ok(lo), Ok(hi)) => x < lo || x > hi,
                _ => false,
            }
        }
        ComparisonOp::Contains => lhs.contains(v1),
        ComparisonOp::StartsWith => lhs.starts_with(v1),
        ComparisonOp::EndsWith => lhs.ends_with(v1),
        ComparisonOp::IsEmpty => lhs.trim().is_empty(),
        ComparisonOp::IsNotEmpty => !lhs.trim().is_empty(),
    }
}

fn numeric(lhs: &str, rhs: &str) -> Option<(f64, f64)> {
    let a = lhs.trim().parse::<f64>().ok()?;
    let b = rhs.trim().parse::<f64>().ok()?;
    Some((a, b))
}
