use hooklift_kernel::middleware::{Flow, Middleware, Request, Response};
use hooklift_kernel::prelude::{FnHook, Hook};
use hooklift_kernel::registry::Registry;
use hooklift_kernel::resolver::{HookOverride, resolve};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn middleware(marker: usize) -> Middleware {
    Middleware::new().with(format!("m{marker}"), move |_req: &mut Request| {
        Flow::Respond(Response::ok(json!(marker)))
    })
}

fn hook(id: &str) -> Arc<dyn Hook> {
    Arc::new(FnHook::new(id, |_ctx| async { Ok(Middleware::new()) }))
}

proptest! {
    #[test]
    fn registry_keys_are_stable_and_last_write_wins(ids in prop::collection::vec("[a-e]", 0..16)) {
        let entries = || ids.iter().enumerate().map(|(i, id)| (id.clone(), middleware(i)));

        let first = Registry::build(entries());
        let second = Registry::build(entries());

        let keys: Vec<&str> = first.namespaces().collect();
        prop_assert_eq!(&keys, &second.namespaces().collect::<Vec<_>>());

        let mut expected: Vec<&str> = ids.iter().map(String::as_str).collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(&keys, &expected);

        for (id, middleware) in first.iter() {
            let last = ids.iter().rposition(|candidate| candidate == id).unwrap();
            prop_assert_eq!(middleware.names().collect::<Vec<_>>(), vec![format!("m{last}")]);
        }
    }

    #[test]
    fn resolution_is_deterministic(
        defaults in prop::collection::vec("[a-f]", 0..10),
        allowed in prop::option::of(prop::collection::vec("[a-f]", 0..6)),
    ) {
        let allow_list = allowed.map(|ids| json!(ids));
        let run = || {
            let hooks: Vec<Arc<dyn Hook>> = defaults.iter().map(|id| hook(id)).collect();
            resolve(hooks, Vec::<(String, HookOverride)>::new(), allow_list.as_ref()).unwrap()
        };

        let first = run();
        let second = run();
        prop_assert_eq!(first.active_ids(), second.active_ids());
        prop_assert_eq!(
            first.disabled().collect::<Vec<_>>(),
            second.disabled().collect::<Vec<_>>()
        );
    }
}
