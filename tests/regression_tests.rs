//! Regression tests to prevent previously fixed issues from reoccurring
//!
//! These tests capture specific bug fixes and edge cases that were problematic
//! in earlier versions of the library.

use block_template::{Error, Partial, PartialRegistry, Partials, Template, TemplateBuilder, TemplateConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::rc::Rc;

#[test]
fn test_regression_empty_array_handling() {
    // Empty arrays render nothing and leave the rest intact
    let template = Template::new(
        "<ul>#{items}<li>${name}</li>#{/items}</ul><p>Count: ${count}</p>",
        Partials::new(),
    )
    .unwrap();
    let result = template.render(&json!({"items": [], "count": 0})).unwrap();
    assert_eq!(result, "<ul></ul><p>Count: 0</p>");
}

#[test]
fn test_regression_partial_placeholders_are_expanded() {
    let mut partials = Partials::new();
    partials.insert("header".to_string(), Partial::from("<h1>${title}</h1>"));
    partials.insert(
        "greeting".to_string(),
        Partial::function(|_: &Value| "Hello %{name}"),
    );
    let template = Template::new("%{@header}%{@greeting}", partials).unwrap();
    let result = template.render(&json!({"title": "Hi", "name": "John"})).unwrap();
    assert_eq!(result, "<h1>Hi</h1>Hello John");
}

#[test]
fn test_regression_self_referencing_value_does_not_loop() {
    let template = Template::new("%{a}", Partials::new()).unwrap();
    let err = template.render(&json!({"a": "%{a}"})).unwrap_err();
    assert!(matches!(err, Error::RenderError(_)));
}

#[test]
fn test_regression_block_ids_are_unique_per_registry() {
    // Two templates on one registry must not overwrite each other's blocks
    let registry = Rc::new(PartialRegistry::new());
    let a = Template::with_registry("#{x:i}a${i}#{/x}", registry.clone()).unwrap();
    let b = Template::with_registry("#{x:i}b${i}#{/x}", registry.clone()).unwrap();
    let params = json!({"x": [1]});
    assert_eq!(a.render(&params).unwrap(), "a1");
    assert_eq!(b.render(&params).unwrap(), "b1");
}

#[test]
fn test_regression_indent_is_whitespace_directly_before_tag() {
    // Text earlier on the line does not cancel the indent, and every
    // occurrence of a tag takes the indent of its first occurrence
    let mut partials = Partials::new();
    partials.insert("text".to_string(), Partial::from("a\nb"));
    let template = Template::new("x  %{@text}\n\t%{@text}", partials).unwrap();
    assert_eq!(template.render(&json!({})).unwrap(), "x  a\n  b\n\ta\n  b");

    let template = Template::new("text %{body}", Partials::new()).unwrap();
    assert_eq!(
        template.render(&json!({"body": "one\ntwo"})).unwrap(),
        "text one\n two"
    );
}

#[test]
fn test_regression_conditional_with_param_suffix() {
    // The predicate path is the whole placeholder, parameter included
    let template = Template::new("?{a:b}yes?{!a:b}no?{/a}", Partials::new()).unwrap();
    assert_eq!(template.render(&json!({"a": true})).unwrap(), "no");
    assert_eq!(template.render(&json!({"a:b": true})).unwrap(), "yes");
}

#[test]
fn test_regression_nested_templates_hold_weak_registry() {
    // Templates built from block content share the parent's registry
    // without keeping it alive on their own
    let template = Template::new("?{a}#{b:i}${i}#{/b}?{/a}", Partials::new()).unwrap();
    let registry = template.registry().unwrap();
    assert_eq!(template.render(&json!({"a": 1, "b": [1, 2]})).unwrap(), "12");
    assert_eq!(Rc::strong_count(&registry), 2);
}

#[test]
fn test_regression_strict_mode_in_nested_blocks() {
    let template = TemplateBuilder::new()
        .from_str("#{items:item}${item.missing}#{/items}")
        .with_config(TemplateConfig::strict())
        .build()
        .unwrap();
    let err = template.render(&json!({"items": [{}]})).unwrap_err();
    assert!(matches!(err, Error::RenderError(_)));
    assert!(err.to_string().contains("item.missing"));
}

#[test]
fn test_regression_undefined_text_in_nested_blocks() {
    let template = Template::with_config(
        "?{show}[${missing}]?{/show}",
        Partials::new(),
        TemplateConfig::new().with_undefined_text("undefined"),
    )
    .unwrap();
    assert_eq!(template.render(&json!({"show": true})).unwrap(), "[undefined]");
}

#[test]
fn test_regression_partial_function_returning_function() {
    let mut partials = Partials::new();
    partials.insert(
        "outer".to_string(),
        Partial::function(|_: &Value| Partial::function(|params: &Value| params["x"].clone())),
    );
    let template = Template::new("${@outer}", partials).unwrap();
    assert_eq!(template.render(&json!({"x": "inner"})).unwrap(), "inner");
}

#[test]
fn test_regression_validator_partial_as_output_is_error() {
    let mut partials = Partials::new();
    partials.insert("v".to_string(), Partial::validator(|_, _| true));
    let template = Template::new("%{@v}", partials).unwrap();
    assert!(matches!(
        template.render(&json!({})).unwrap_err(),
        Error::TypeError(_)
    ));
}

#[test]
fn test_regression_blocks_built_lazily() {
    // Unused branches never touch the failing content
    let template = Template::new("?{ok}fine?{!ok}#{nope}x#{/nope}?{/ok}", Partials::new()).unwrap();
    assert_eq!(template.render(&json!({"ok": true})).unwrap(), "fine");
    assert!(template.render(&json!({"ok": false})).is_err());
}
