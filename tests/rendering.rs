// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end rendering tests

mod utils;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use stencil::engine::{MustacheEngineBuilder, ThrowingMissingValueHandler};
use stencil::model::{FnLambda, InputType, Value};
use stencil::resolver::{ResolutionContext, Resolver};
use stencil::segment::MustacheTagInfo;
use stencil::{EngineConfig, MustacheError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use utils::{Hammer, builder_with, engine_with, render};

#[rstest]
#[case("Hello {{name}}!", "Hello Martin!")]
#[case("{{missing}}", "")]
#[case("{{person.address.city}}", "Prague")]
#[case("{{person.missing.city}}", "")]
#[case("{{#items}}[{{.}}]{{/items}}", "[1][2][3]")]
#[case("{{#items}}{{this}}{{/items}}", "123")]
#[case("{{items.1}}", "2")]
#[case("{{#person}}{{name}} from {{address.city}}{{/person}}", "Jan from Prague")]
#[case("{{#empty}}x{{/empty}}{{^empty}}none{{/empty}}", "none")]
#[case("{{#active}}on{{/active}}{{^active}}off{{/active}}", "on")]
#[case("{{^missing}}fallback{{/missing}}", "fallback")]
#[case("a{{! ignored }}b", "ab")]
#[case("{{=<% %>=}}<% name %> {{name}}", "Martin {{name}}")]
fn test_render(#[case] source: &str, #[case] expected: &str) {
    let data = Value::from(json!({
        "name": "Martin",
        "items": [1, 2, 3],
        "empty": [],
        "active": true,
        "person": {"name": "Jan", "address": {"city": "Prague"}}
    }));
    assert_eq!(render(source, data), expected);
}

#[rstest]
#[case("{{value}}", "&lt;b&gt;")]
#[case("{{{value}}}", "<b>")]
#[case("{{&value}}", "<b>")]
fn test_escaping(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(render(source, Value::map([("value", "<b>")])), expected);
}

#[test]
fn test_skip_value_escaping() {
    let engine = MustacheEngineBuilder::new()
        .config(EngineConfig {
            skip_value_escaping: true,
            ..EngineConfig::default()
        })
        .build()
        .unwrap();
    let template = engine.compile_mustache("raw", "{{value}}").unwrap();
    assert_eq!(template.render(Value::map([("value", "<b>")])).unwrap(), "<b>");
}

#[test]
fn test_standalone_lines() {
    let source = "<ul>\n  {{#items}}\n  <li>{{.}}</li>\n  {{/items}}\n</ul>\n";
    assert_eq!(
        render(source, Value::map([("items", Value::list(["a", "b"]))])),
        "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n"
    );
}

#[test]
fn test_inner_scope_shadows_outer() {
    let data = Value::from(json!({
        "name": "outer",
        "child": {"name": "inner"},
        "nameless": {"age": 1}
    }));
    assert_eq!(
        render("{{#child}}{{name}}{{/child}}|{{#nameless}}{{name}}{{/nameless}}", data),
        "inner|outer"
    );
}

#[test]
fn test_matched_null_does_not_fall_through() {
    let data = Value::from(json!({"name": "outer", "child": {"name": null}}));
    assert_eq!(render("{{#child}}[{{name}}]{{/child}}", data), "[]");
}

#[test]
fn test_reflection_resolver() {
    let hammer = Value::object(Hammer {
        age: 10,
        name: "Thor".to_string(),
    });
    assert_eq!(
        render("{{hammer.name}} is {{hammer.age}}{{#hammer}} ({{name}}){{/hammer}}", Value::map([("hammer", hammer)])),
        "Thor is 10 (Thor)"
    );
}

#[test]
fn test_global_data() {
    let engine = MustacheEngineBuilder::new()
        .add_global_data("version", "1.2")
        .build()
        .unwrap();
    let template = engine.compile_mustache("global", "{{version}}/{{#item}}{{version}}{{/item}}").unwrap();

    assert_eq!(template.render(Value::map([("item", Value::map([("x", 1)]))])).unwrap(), "1.2/1.2");
    // Scopes shadow global data
    assert_eq!(
        template
            .render(Value::map([("version", Value::from("local")), ("item", Value::from(true))]))
            .unwrap(),
        "local/local"
    );
}

#[test]
fn test_missing_value_handler_replacement() {
    let engine = MustacheEngineBuilder::new()
        .set_missing_value_handler(|tag: &MustacheTagInfo| -> Result<Option<Value>> {
            Ok(Some(Value::from(format!("<{}@{}>", tag.text, tag.line))))
        })
        .build()
        .unwrap();
    let template = engine.compile_mustache("missing", "\n{{{foo}}} {{bar}}").unwrap();
    assert_eq!(template.render(Value::Null).unwrap(), "\n<foo@2> &lt;bar@2&gt;");
}

#[test]
fn test_throwing_missing_value_handler() {
    let engine = MustacheEngineBuilder::new()
        .set_missing_value_handler(ThrowingMissingValueHandler)
        .build()
        .unwrap();
    let template = engine.compile_mustache("strict", "Hi {{name}}").unwrap();

    assert_eq!(template.render(Value::map([("name", "Ann")])).unwrap(), "Hi Ann");
    assert_eq!(
        template.render(Value::map([("other", "x")])).unwrap_err(),
        MustacheError::MissingValue {
            tag: "name".to_string(),
            template: "strict".to_string(),
            line: 1
        }
    );
}

#[test]
fn test_output_before_failure_stays_in_sink() {
    let engine = MustacheEngineBuilder::new()
        .set_missing_value_handler(ThrowingMissingValueHandler)
        .build()
        .unwrap();
    let template = engine.compile_mustache("partial_output", "before {{missing}} after").unwrap();
    let mut out = String::new();

    assert!(template.render_to(&mut out, Value::Null).is_err());
    assert_eq!(out, "before ");
}

#[test]
fn test_lambda_interpolation() {
    let data = |interpolated: bool| {
        Value::map([
            ("inner", Value::from("X")),
            (
                "lambda",
                Value::lambda(FnLambda::constant("{{inner}}").interpolated(interpolated)),
            ),
        ])
    };
    assert_eq!(render("{{lambda}}", data(true)), "X");
    assert_eq!(render("{{{lambda}}}", data(false)), "{{inner}}");
}

#[test]
fn test_interpolated_lambda_output_is_escaped() {
    let data = Value::map([
        ("inner", Value::from("<i>")),
        ("lambda", Value::lambda(FnLambda::constant("<b>{{{inner}}}</b>"))),
    ]);
    assert_eq!(render("{{lambda}}", data.clone()), "&lt;b&gt;&lt;i&gt;&lt;/b&gt;");
    assert_eq!(render("{{{lambda}}}", data), "<b><i></b>");
}

#[test]
fn test_lambda_returning_nothing_uses_missing_value_handler() {
    let engine = MustacheEngineBuilder::new()
        .set_missing_value_handler(|_tag: &MustacheTagInfo| -> Result<Option<Value>> {
            Ok(Some(Value::from("n/a")))
        })
        .build()
        .unwrap();
    let template = engine.compile_mustache("lambda_none", "{{lambda}}").unwrap();
    let data = Value::map([("lambda", Value::lambda(FnLambda::new(|_| Ok(None))))]);

    assert_eq!(template.render(data).unwrap(), "n/a");
}

#[test]
fn test_lambda_failure() {
    let data = Value::map([(
        "lambda",
        Value::lambda(FnLambda::new(|_| Err(anyhow::anyhow!("boom")))),
    )]);
    let engine = MustacheEngineBuilder::new().build().unwrap();
    let err = engine
        .compile_mustache("failing", "{{lambda}}")
        .unwrap()
        .render(data)
        .unwrap_err();

    assert_eq!(
        err,
        MustacheError::Lambda {
            tag: "lambda".to_string(),
            message: "boom".to_string()
        }
    );
}

#[test]
fn test_lambda_interpolation_compile_failure() {
    let data = Value::map([("lambda", Value::lambda(FnLambda::constant("{{#open}}")))]);
    let engine = MustacheEngineBuilder::new().build().unwrap();
    let err = engine
        .compile_mustache("bad_lambda", "{{lambda}}")
        .unwrap()
        .render(data)
        .unwrap_err();

    assert!(!err.is_compilation_error());
    match err {
        MustacheError::Lambda { tag, message } => {
            assert_eq!(tag, "lambda");
            assert!(message.contains("Unterminated section open"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_self_referential_lambda_hits_recursion_limit() {
    let data = Value::map([("me", Value::lambda(FnLambda::constant("x{{me}}")))]);
    let engine = MustacheEngineBuilder::new().build().unwrap();
    let err = engine
        .compile_mustache("t", "{{me}}")
        .unwrap()
        .render(data)
        .unwrap_err();

    assert_eq!(
        err,
        MustacheError::RecursiveInvocationLimitExceeded {
            template: "oneoff_lambda".to_string(),
            limit: 10
        }
    );
}

#[test]
fn test_self_referential_section_lambda_hits_recursion_limit() {
    let me = FnLambda::new(|_| Ok(Some("{{#me}}y{{/me}}".to_string())));
    let data = Value::map([("me", Value::lambda(me))]);
    let engine = MustacheEngineBuilder::new()
        .config(EngineConfig {
            recursive_invocation_limit: 3,
            ..EngineConfig::default()
        })
        .build()
        .unwrap();
    let err = engine
        .compile_mustache("t", "{{#me}}x{{/me}}")
        .unwrap()
        .render(data)
        .unwrap_err();

    assert_eq!(
        err,
        MustacheError::RecursiveInvocationLimitExceeded {
            template: "oneoff_lambda".to_string(),
            limit: 3
        }
    );
}

#[test]
fn test_sibling_lambda_renders_do_not_count_as_recursion() {
    let data = Value::map([
        ("items", Value::list(0..20)),
        ("lambda", Value::lambda(FnLambda::constant("<{{.}}>"))),
    ]);
    let expected: String = (0..20).map(|i| format!("&lt;{i}&gt;")).collect();

    assert_eq!(render("{{#items}}{{lambda}}{{/items}}", data), expected);
}

#[test]
fn test_section_lambda_input_types() {
    let literal = FnLambda::new(|text| Ok(text.map(|text| format!("<{text}>")))).interpolated(false);
    let processed = FnLambda::new(|text| Ok(text.map(str::to_uppercase)))
        .input(InputType::Processed)
        .interpolated(false);
    let interpolated = FnLambda::new(|text| Ok(text.map(|text| format!("{text}{text}"))));
    let data = Value::map([
        ("name", Value::from("jim")),
        ("literal", Value::lambda(literal)),
        ("processed", Value::lambda(processed)),
        ("interpolated", Value::lambda(interpolated)),
    ]);

    assert_eq!(
        render(
            "{{#literal}}{{name}}{{/literal}}|{{#processed}}{{name}}{{/processed}}|{{#interpolated}}{{name}}{{/interpolated}}",
            data
        ),
        "<{{name}}>|JIM|jimjim"
    );
}

#[test]
fn test_partials() {
    let engine = engine_with(&[
        ("page", "<h1>{{title}}</h1>\n{{#items}}\n{{>item}}\n{{/items}}\n"),
        ("item", "- {{name}}\n"),
    ]);
    let page = engine.get_mustache("page").unwrap().unwrap();
    let data = Value::from(json!({"title": "List", "items": [{"name": "a"}, {"name": "b"}]}));

    assert_eq!(page.render(data).unwrap(), "<h1>List</h1>\n- a\n- b\n");
}

#[test]
fn test_missing_partial() {
    let engine = engine_with(&[("page", "x\n{{>nothing}}")]);
    let err = engine.get_mustache("page").unwrap().unwrap().render(Value::Null).unwrap_err();

    assert_eq!(
        err,
        MustacheError::PartialNotFound {
            name: "nothing".to_string(),
            template: "page".to_string(),
            line: 2
        }
    );
}

#[test]
fn test_recursive_partials() {
    let engine = builder_with(&[("node", "{{name}}{{#children}}({{>node}}){{/children}}")])
        .config(EngineConfig {
            recursive_invocation_limit: 3,
            ..EngineConfig::default()
        })
        .build()
        .unwrap();
    let node = engine.get_mustache("node").unwrap().unwrap();

    // Leaves need their own empty list, otherwise `children` resolves in an outer scope
    let shallow = json!({"name": "a", "children": [{"name": "b", "children": [{"name": "c", "children": []}]}]});
    assert_eq!(node.render(Value::from(shallow)).unwrap(), "a(b(c))");

    let deep = json!({"name": "a", "children": [{"name": "b", "children": [{"name": "c", "children": [{"name": "d", "children": []}]}]}]});
    assert_eq!(
        node.render(Value::from(deep)).unwrap_err(),
        MustacheError::RecursiveInvocationLimitExceeded {
            template: "node".to_string(),
            limit: 3
        }
    );
}

#[test]
fn test_compilation_errors() {
    let engine = engine_with(&[("broken", "ok\n{{#a}}\n{{/b}}")]);
    let err = engine.get_mustache("broken").unwrap_err();
    assert_eq!(err, MustacheError::compilation("broken", 3, "Section a closed by b"));

    // A failed computation is not cached
    assert!(engine.get_mustache("broken").is_err());
}

#[test]
fn test_release_callbacks_run_on_failure() {
    use stencil::resolver::{ResolutionContext, Resolver};

    #[derive(Debug)]
    struct Leasing(Arc<AtomicUsize>);

    impl Resolver for Leasing {
        fn priority(&self) -> i32 {
            1
        }

        fn resolve(
            &self,
            _context_object: Option<&Value>,
            name: &str,
            context: &mut ResolutionContext,
        ) -> Result<Option<Value>> {
            if name != "lease" {
                return Ok(None);
            }
            let released = Arc::clone(&self.0);
            context.register_release_callback(move || {
                released.fetch_add(1, Ordering::SeqCst);
            });
            Ok(Some(Value::map([("id", 7)])))
        }
    }

    let released = Arc::new(AtomicUsize::new(0));
    let engine = MustacheEngineBuilder::new()
        .add_resolver(Leasing(Arc::clone(&released)))
        .set_missing_value_handler(ThrowingMissingValueHandler)
        .build()
        .unwrap();

    let ok = engine.compile_mustache("ok", "{{#lease}}{{id}}{{/lease}}{{lease.id}}").unwrap();
    assert_eq!(ok.render(Value::Null).unwrap(), "77");
    assert_eq!(released.load(Ordering::SeqCst), 2);

    let failing = engine.compile_mustache("failing", "{{#lease}}{{missing}}{{/lease}}").unwrap();
    assert!(failing.render(Value::Null).is_err());
    assert_eq!(released.load(Ordering::SeqCst), 3);
}

#[derive(Debug)]
struct FailingResolver;

impl Resolver for FailingResolver {
    fn priority(&self) -> i32 {
        1
    }

    fn resolve(
        &self,
        _context_object: Option<&Value>,
        name: &str,
        _context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        if name == "broken" {
            return Err(MustacheError::resolver("FailingResolver", name, "backend down"));
        }
        Ok(None)
    }
}

#[test]
fn test_resolver_failure_is_a_rendering_error() {
    let engine = MustacheEngineBuilder::new().add_resolver(FailingResolver).build().unwrap();
    let template = engine.compile_mustache("resolving", "a{{ok}}{{broken}}").unwrap();
    let err = template.render(Value::map([("ok", "b")])).unwrap_err();

    assert!(!err.is_compilation_error());
    assert_eq!(
        err.to_string(),
        "Resolver FailingResolver failed while resolving 'broken': backend down"
    );
}
