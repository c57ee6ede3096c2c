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

//! Rendering from many threads against one engine

mod utils;

use pretty_assertions::assert_eq;
use stencil::engine::{MustacheEngineBuilder, TemplateLocator};
use stencil::model::Value;
use stencil::resolver::{ResolutionContext, Resolver};
use stencil::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use utils::engine_with;

const THREADS: usize = 8;
const RENDERS: usize = 50;

#[test]
fn test_same_template_different_data() {
    let engine = engine_with(&[(
        "list",
        "{{#items}}{{name}}:{{owner}};{{/items}}{{^items}}none{{/items}}",
    )]);

    thread::scope(|scope| {
        for thread_index in 0..THREADS {
            let engine = engine.clone();
            scope.spawn(move || {
                let owner = format!("t{thread_index}");
                let expected: String = (0..3).map(|i| format!("n{i}:{owner};")).collect();
                for _ in 0..RENDERS {
                    let data = Value::map([
                        ("owner", Value::from(owner.as_str())),
                        (
                            "items",
                            Value::list((0..3).map(|i| Value::map([("name", format!("n{i}"))]))),
                        ),
                    ]);
                    let template = engine.get_mustache("list").unwrap().unwrap();
                    assert_eq!(template.render(data).unwrap(), expected);
                }
            });
        }
    });
}

/// Answers `tracked` and registers a release callback for every answer
#[derive(Debug)]
struct TrackingResolver {
    resolved: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Resolver for TrackingResolver {
    fn priority(&self) -> i32 {
        1
    }

    fn resolve(
        &self,
        _context_object: Option<&Value>,
        name: &str,
        context: &mut ResolutionContext,
    ) -> Result<Option<Value>> {
        if name != "tracked" {
            return Ok(None);
        }
        self.resolved.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        context.register_release_callback(move || {
            released.fetch_add(1, Ordering::SeqCst);
        });
        Ok(Some(Value::from("tracked")))
    }
}

#[test]
fn test_release_callbacks_stay_with_their_render() {
    let resolved = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let engine = MustacheEngineBuilder::new()
        .add_resolver(TrackingResolver {
            resolved: Arc::clone(&resolved),
            released: Arc::clone(&released),
        })
        .build()
        .unwrap();
    let template = engine
        .compile_mustache("tracked", "{{tracked}}/{{#tracked}}{{id}}{{/tracked}}")
        .unwrap();

    thread::scope(|scope| {
        for thread_index in 0..THREADS {
            let template = Arc::clone(&template);
            scope.spawn(move || {
                for _ in 0..RENDERS {
                    let rendered = template.render(Value::map([("id", thread_index)])).unwrap();
                    assert_eq!(rendered, format!("tracked/{thread_index}"));
                }
            });
        }
    });

    assert_eq!(resolved.load(Ordering::SeqCst), THREADS * RENDERS * 2);
    assert_eq!(released.load(Ordering::SeqCst), THREADS * RENDERS * 2);
}

/// Counts lookups and answers slowly so that callers overlap
#[derive(Debug, Default)]
struct SlowLocator {
    lookups: AtomicUsize,
}

impl TemplateLocator for SlowLocator {
    fn locate(&self, name: &str) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok((name == "slow").then(|| "{{greeting}}".to_string()))
    }
}

#[derive(Debug)]
struct SharedLocator(Arc<SlowLocator>);

impl TemplateLocator for SharedLocator {
    fn locate(&self, name: &str) -> Result<Option<String>> {
        self.0.locate(name)
    }
}

#[test]
fn test_first_lookup_compiles_once() {
    let locator = Arc::new(SlowLocator::default());
    let engine = MustacheEngineBuilder::new()
        .add_template_locator(SharedLocator(Arc::clone(&locator)))
        .build()
        .unwrap();
    let barrier = Barrier::new(THREADS);

    let templates: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = engine.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    engine.get_mustache("slow").unwrap().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(locator.lookups.load(Ordering::SeqCst), 1);
    assert!(templates.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(
        templates[0].render(Value::map([("greeting", "hi")])).unwrap(),
        "hi"
    );
}
