//! End-to-end rendering through templates, covering the default filter
//! catalog and block expansion against realistic data.

use potion::{Filtered, Potion, RenderError, Settings};
use serde_json::{json, Value};

fn engine() -> Potion {
    Potion::with_settings(Settings::new("[", "]")).unwrap()
}

fn render(template: &str, data: Value) -> String {
    engine().render(template, &data).unwrap()
}

fn data() -> Value {
    json!({
        "test": "Hello World",
        "num": 1.25,
        "count": -3,
        "words": ["Hello", "World"],
        "array": ["Hello", null, "World"],
        "user": {"name": "Ada", "tags": ["a", "b", "a"]},
        "html": "<p>Hello <b>World</b></p>",
        "padded": "  Hello  ",
        "show": true,
        "hide": false,
    })
}

#[test]
fn string_filters_through_templates() {
    assert_eq!(render("[test | uppercase]", data()), "HELLO WORLD");
    assert_eq!(render("[test | lowercase]", data()), "hello world");
    assert_eq!(render("[user.name | lowercase | capitalize]", data()), "Ada");
    assert_eq!(render("[test | truncate: 5, '...']", data()), "Hello...");
    assert_eq!(render("[test | truncate: 5]", data()), "Hello");
    assert_eq!(render("[padded | trim]", data()), "Hello");
    assert_eq!(render("[padded | lstrip]", data()), "Hello  ");
    assert_eq!(render("[padded | rstrip]", data()), "  Hello");
    assert_eq!(render("[test | append: '!']", data()), "Hello World!");
    assert_eq!(render("[test | prepend: '> ']", data()), "> Hello World");
    assert_eq!(render("[test | remove: 'l']", data()), "Heo Word");
    assert_eq!(render("[test | remove_first: 'l']", data()), "Helo World");
    assert_eq!(
        render("[test | replace: 'World', 'There']", data()),
        "Hello There"
    );
    assert_eq!(
        render("[test | replace_first: 'l', 'L']", data()),
        "HeLlo World"
    );
    assert_eq!(render("[html | strip_html]", data()), "Hello World");
    assert_eq!(
        render("[html | escape]", data()),
        "&lt;p&gt;Hello &lt;b&gt;World&lt;/b&gt;&lt;/p&gt;"
    );
    assert_eq!(
        render("[test | url_encode]", data()),
        "Hello%20World"
    );
}

#[test]
fn default_filter_fills_missing_values() {
    assert_eq!(render("[absent | default: 'n/a']", data()), "n/a");
    assert_eq!(render("[test | default: 'n/a']", data()), "Hello World");
}

#[test]
fn numeric_filters_through_templates() {
    assert_eq!(render("[count | abs]", data()), "3");
    assert_eq!(render("[num | ceil]", data()), "2");
    assert_eq!(render("[num | floor]", data()), "1");
    assert_eq!(render("[num | round]", data()), "1");
    assert_eq!(render("[num | round: 1]", data()), "1.3");
    assert_eq!(render("[count | plus: 5]", data()), "2");
    assert_eq!(render("[count | minus: 2]", data()), "-5");
    assert_eq!(render("[count | times: -2]", data()), "6");
    assert_eq!(render("[count | abs | at_least: 10]", data()), "10");
    assert_eq!(render("[count | abs | at_most: 1]", data()), "1");
    assert_eq!(render("[count | abs | divided_by: 2]", data()), "1.5");
    assert_eq!(render("[count | abs | divided_by: 0]", data()), "3");
    assert_eq!(render("[count | abs | modulo: 2]", data()), "1");
}

#[test]
fn sequence_filters_through_templates() {
    assert_eq!(render("[test | split: '']", data()), "H,e,l,l,o, ,W,o,r,l,d");
    assert_eq!(render("[test | split: ' ' | join: '-']", data()), "Hello-World");
    assert_eq!(render("[words | first]", data()), "Hello");
    assert_eq!(render("[words | last]", data()), "World");
    assert_eq!(render("[words | map: 'length']", data()), "5,5");
    assert_eq!(render("[words | reverse]", data()), "World,Hello");
    assert_eq!(render("[test | reverse]", data()), "dlroW olleH");
    assert_eq!(render("[words | size]", data()), "2");
    assert_eq!(render("[test | size]", data()), "11");
    assert_eq!(render("[test | slice: 0, 5]", data()), "Hello");
    assert_eq!(render("[test | slice: -5]", data()), "World");
    assert_eq!(render("[user.tags | sort]", data()), "a,a,b");
    assert_eq!(render("[user.tags | unique]", data()), "a,b");
    assert_eq!(render("[array | compact | join: '']", data()), "HelloWorld");
}

#[test]
fn boolean_blocks() {
    assert_eq!(render("[show]on[/show]", data()), "on");
    assert_eq!(render("[hide]on[/hide]", data()), "");
    assert_eq!(render("[!hide]off[/hide]", data()), "off");
    assert_eq!(render("[!show]off[/show]", data()), "");
    assert_eq!(render("a [show]b [test] c[/show] d", data()), "a b Hello World c d");
}

#[test]
fn loops_expand_blocks() {
    assert_eq!(
        render("[nums][_value][/nums]", json!({"nums": [1, 2, 3]})),
        "123"
    );
    assert_eq!(
        render("[words][_key]:[_value] [/words]", data()),
        "0:Hello1:World"
    );
    assert_eq!(render("[array | compact][_value][/array]", data()), "HelloWorld");
    assert_eq!(
        render(
            "[people][name] is [age]. [/people]",
            json!({"people": [{"name": "Ada", "age": 36}, {"name": "Alan", "age": 41}]}),
        ),
        "Ada is 36.Alan is 41."
    );
}

#[test]
fn loop_fragments_carry_tracking_keys() {
    let potion = engine();
    let out = potion
        .render(
            "[items]<li>[_value]</li>[/items]",
            &json!({"items": ["a", "b"]}),
        )
        .unwrap();

    let ids: Vec<&str> = out
        .split("data-potion-key=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(
        potion.contexts().lookup(ids[1]).unwrap()["_value"],
        json!("b")
    );
}

#[test]
fn named_templates_render_by_name() {
    let potion = engine();
    potion.templates().set_many([
        ("row", "<tr><td>[name]</td></tr>"),
        ("cell", "[name]"),
    ]);

    let out = potion.render("row", &json!({"name": "Ada"})).unwrap();
    assert_eq!(out, "<tr><td>Ada</td></tr>");

    let err = potion.render_named("missing", &json!({})).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound(_)));
}

#[test]
fn unclosed_blocks_error() {
    let err = engine()
        .render("[show]on", &json!({"show": true}))
        .unwrap_err();
    assert_eq!(err.to_string(), "'show' not closed");
}

#[test]
fn missing_tokens_do_not_fail_the_render() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert_eq!(render("a[nope.deep]b", data()), "ab");
}

#[test]
fn custom_delimiters() {
    let potion = Potion::new().unwrap();
    let out = potion
        .render("{{ test | uppercase }}", &json!({"test": "hi"}))
        .unwrap();
    assert_eq!(out, "HI");
}

#[test]
fn custom_filters_compose_with_builtins() {
    let potion = engine();
    potion
        .register_filter("stars", |payload, _| {
            Ok(match payload {
                Some(Value::String(s)) => Filtered::Value(Value::String(format!("*{}*", s))),
                _ => Filtered::Pass,
            })
        })
        .unwrap();
    let out = potion
        .render("[test | truncate: 5 | stars]", &json!({"test": "Hello World"}))
        .unwrap();
    assert_eq!(out, "*Hello*");
}

#[test]
fn filter_priority_orders_implementations() {
    let potion = engine();
    potion
        .register_filter_with_priority("decorate", 10, |payload, _| {
            Ok(match payload {
                Some(Value::String(s)) => Filtered::Value(Value::String(format!("{}b", s))),
                _ => Filtered::Pass,
            })
        })
        .unwrap();
    potion
        .register_filter_with_priority("decorate", 0, |payload, _| {
            Ok(match payload {
                Some(Value::String(s)) => Filtered::Value(Value::String(format!("{}a", s))),
                _ => Filtered::Pass,
            })
        })
        .unwrap();
    let out = potion
        .render("[test | decorate]", &json!({"test": "x"}))
        .unwrap();
    assert_eq!(out, "xab");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn plain_text_renders_verbatim(text in "[A-Za-z0-9 .,!?\n]*") {
            prop_assert_eq!(render(&text, json!({})), text);
        }

        #[test]
        fn string_values_splice_verbatim(value in "[A-Za-z0-9 ]*") {
            let out = render("<[key]>", json!({"key": value.clone()}));
            prop_assert_eq!(out, format!("<{}>", value));
        }
    }
}

#[test]
fn engine_is_shareable_across_threads() {
    use std::sync::Arc;

    let potion = Arc::new(engine());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let potion = Arc::clone(&potion);
            std::thread::spawn(move || {
                potion
                    .render("[n | plus: 1]", &json!({"n": i}))
                    .unwrap()
            })
        })
        .collect();
    let mut outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    outputs.sort();
    assert_eq!(outputs, ["1", "2", "3", "4"]);
}
