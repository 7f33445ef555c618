use cty::{RefinementBuilder, Type, Value};

#[test]
fn point_refinement_collapses_to_known_number() {
    let value = Value::unknown(Type::Number)
        .refine()
        .number_range_inclusive(&Value::number_int(1), &Value::number_int(1))
        .not_null()
        .new_value();
    assert!(value.is_known());
    assert!(value.raw_equals(&Value::number_int(1)));
}

fn non_empty_list(builder: RefinementBuilder) -> RefinementBuilder {
    builder.not_null().collection_length_lower_bound(1)
}

#[test]
fn shared_refinement_functions() {
    let value = Value::unknown(Type::list(Type::String)).refine_with(non_empty_list);
    let range = value.range();
    assert!(range.definitely_not_null());
    assert_eq!(range.length_lower_bound(), 1);
    assert!(value.length().greater_than(&Value::zero()).is_true());
}

#[test]
fn refined_unknowns_decide_equality() {
    let prefixed = Value::unknown(Type::String)
        .refine()
        .string_prefix_full("https:")
        .new_value();
    assert!(prefixed.equals(&Value::string("http://x")).is_false());
    assert!(!prefixed.equals(&Value::string("https://x")).is_known());
}

#[test]
fn refinements_survive_marks() {
    let mark = cty::Mark::new("m");
    let value = Value::unknown(Type::Number)
        .mark(mark.clone())
        .refine()
        .number_range_lower_bound(&Value::number_int(10), true)
        .new_value();
    assert!(value.has_mark(&mark));
    let (value, _) = value.unmark();
    assert!(value.less_than(&Value::number_int(10)).is_false());
}

#[test]
fn refinement_debug_output() {
    let value = Value::unknown(Type::Number)
        .refine()
        .not_null()
        .number_range_lower_bound(&Value::number_int(0), true)
        .new_value();
    assert_eq!(format!("{value:?}"), "Unknown(Number, {not_null, >= 0})");
}
