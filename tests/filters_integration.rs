//! Integration tests for placeholder filters

use block_template::{Error, Filter, Partials, Template};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn render(content: &str, params: Value) -> Result<String, Error> {
    Template::new(content, Partials::new())?.render(&params)
}

#[test]
fn test_string_filters() {
    let params = json!({"name": "  mixed Case  ", "word": "hello"});
    assert_eq!(render("${word|upper}", params.clone()).unwrap(), "HELLO");
    assert_eq!(render("${name|lower}", params.clone()).unwrap(), "  mixed case  ");
    assert_eq!(render("${word|capitalize}", params.clone()).unwrap(), "Hello");
    assert_eq!(render("[${name|trim}]", params).unwrap(), "[mixed Case]");
}

#[test]
fn test_number_filters() {
    let params = json!({"number": -1, "price": "4.5 EUR", "ratio": 2.4, "neg": -2.5});
    assert_eq!(render("%{number|abs}", params.clone()).unwrap(), "1");
    assert_eq!(render("%{price|round}", params.clone()).unwrap(), "5");
    assert_eq!(render("%{ratio|round}", params.clone()).unwrap(), "2");
    assert_eq!(render("%{neg|round}", params.clone()).unwrap(), "-2");
    assert_eq!(render("%{ratio|floor}", params.clone()).unwrap(), "2");
    assert_eq!(render("%{ratio|ceil}", params.clone()).unwrap(), "3");
    assert_eq!(render("%{neg|abs}", params).unwrap(), "2.5");
}

#[test]
fn test_number_filter_on_text_yields_nan() {
    assert_eq!(render("%{x|abs}", json!({"x": "abc"})).unwrap(), "NaN");
    assert_eq!(render("%{missing|floor}", json!({})).unwrap(), "NaN");
}

#[test]
fn test_array_filters() {
    let params = json!({"list": ["b", "a", "c"], "numbers": [4, "12", 7.5]});
    assert_eq!(render("${list|first}", params.clone()).unwrap(), "b");
    assert_eq!(render("${list|last}", params.clone()).unwrap(), "c");
    assert_eq!(render("${numbers|min}", params.clone()).unwrap(), "4");
    assert_eq!(render("${numbers|max}", params).unwrap(), "12");
}

#[test]
fn test_first_of_empty_array_is_absent() {
    assert_eq!(render("[${list|first}]", json!({"list": []})).unwrap(), "[]");
}

#[test]
fn test_stringify_filter() {
    let params = json!({"data": {"a": [1, 2]}, "text": "<b>"});
    assert_eq!(render("%{data|stringify}", params.clone()).unwrap(), r#"{"a":[1,2]}"#);
    assert_eq!(
        render("${data|stringify}", params.clone()).unwrap(),
        "{&#34;a&#34;:[1,2]}"
    );
    assert_eq!(render("%{text|stringify}", params).unwrap(), r#""<b>""#);
}

#[test]
fn test_filter_applies_to_partials() {
    let mut partials = Partials::new();
    partials.insert("site".to_string(), "example".into());
    let template = Template::new("${@site|upper}", partials).unwrap();
    assert_eq!(template.render(&json!({})).unwrap(), "EXAMPLE");
}

#[test]
fn test_filter_inside_repeating_block() {
    let template = Template::new("#{names:n}${n|capitalize} #{/names}", Partials::new()).unwrap();
    assert_eq!(
        template.render(&json!({"names": ["ada", "grace"]})).unwrap(),
        "Ada Grace "
    );
}

#[test]
fn test_unknown_filter_is_syntax_error_at_render() {
    let template = Template::new("${name|shout}", Partials::new()).unwrap();
    let err = template.render(&json!({"name": "x"})).unwrap_err();
    assert!(matches!(err, Error::SyntaxError(_)));
    assert_eq!(err.to_string(), "Syntax error: unhandled filter \"shout\"");
}

#[test]
fn test_filter_on_wrong_shape_is_type_error() {
    let err = render("${n|upper}", json!({"n": 3})).unwrap_err();
    assert!(matches!(err, Error::TypeError(_)));

    let err = render("${s|max}", json!({"s": "abc"})).unwrap_err();
    assert!(matches!(err, Error::TypeError(_)));
}

#[test]
fn test_every_filter_has_a_name() {
    let names: Vec<String> = Filter::ALL.iter().map(|f| f.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "upper", "lower", "capitalize", "trim", "abs", "round", "floor", "ceil", "first",
            "last", "min", "max", "stringify"
        ]
    );
}
