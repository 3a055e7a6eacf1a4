//! Ordering, cycle, blacklist and migration behavior of the reload engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use modreload::{InitializerLoader, ModuleDef, Reloader, Runtime, StateSnapshot};
use parking_lot::Mutex;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn logged(log: &Log, name: &'static str, deps: &'static [&'static str]) -> ModuleDef {
    let log = Arc::clone(log);
    ModuleDef::new(name, move |scope| {
        for dep in deps {
            scope.import(dep)?;
        }
        log.lock().push(name.to_string());
        Ok(())
    })
    .path(format!("/app/{name}.rs"))
}

fn reloader_for(loader: InitializerLoader, exclude: &[&str]) -> Reloader {
    let runtime = Arc::new(Runtime::builder().loader(loader).build());
    let reloader = Reloader::new(runtime);
    reloader.enable(exclude.iter().copied());
    reloader
}

#[test]
fn test_chain_reloads_dependencies_first() {
    let log: Log = Arc::default();
    let loader = InitializerLoader::new()
        .module(logged(&log, "a", &["b"]))
        .module(logged(&log, "b", &["c"]))
        .module(logged(&log, "c", &[]));
    let reloader = reloader_for(loader, &[]);

    reloader.runtime().import("a").unwrap();
    assert_eq!(*log.lock(), vec!["c", "b", "a"]);
    log.lock().clear();

    let report = reloader.reload("a").unwrap();

    assert_eq!(*log.lock(), vec!["c", "b", "a"]);
    assert_eq!(report.reloaded, vec!["c", "b", "a"]);
}

#[test]
fn test_cycle_terminates_and_reloads_each_once() {
    let log: Log = Arc::default();
    let loader = InitializerLoader::new()
        .module(logged(&log, "a", &["b"]))
        .module(logged(&log, "b", &["a"]));
    let reloader = reloader_for(loader, &[]);

    reloader.runtime().import("a").unwrap();
    assert_eq!(reloader.dependencies_of("a").unwrap(), vec!["b"]);
    assert_eq!(reloader.dependencies_of("b").unwrap(), vec!["a"]);
    log.lock().clear();

    let report = reloader.reload("a").unwrap();

    assert_eq!(report.reloaded, vec!["b", "a"]);
    assert_eq!(*log.lock(), vec!["b", "a"]);
}

#[test]
fn test_blacklist_prunes_subtree() {
    let log: Log = Arc::default();
    let loader = InitializerLoader::new()
        .module(logged(&log, "a", &["b"]))
        .module(logged(&log, "b", &["c"]))
        .module(logged(&log, "c", &[]));
    let reloader = reloader_for(loader, &["b"]);

    reloader.runtime().import("a").unwrap();
    // Blacklisted modules are still tracked.
    assert_eq!(reloader.dependencies_of("a").unwrap(), vec!["b"]);
    assert_eq!(reloader.dependencies_of("b").unwrap(), vec!["c"]);
    log.lock().clear();

    let report = reloader.reload("a").unwrap();

    assert_eq!(report.reloaded, vec!["a"]);
    assert_eq!(report.blacklisted, vec!["b"]);
    assert_eq!(*log.lock(), vec!["a"]);
}

#[test]
fn test_independently_reachable_dependency_still_reloads() {
    let log: Log = Arc::default();
    let loader = InitializerLoader::new()
        .module(logged(&log, "a", &["c", "b"]))
        .module(logged(&log, "b", &["c"]))
        .module(logged(&log, "c", &[]));
    let reloader = reloader_for(loader, &["b"]);

    reloader.runtime().import("a").unwrap();
    log.lock().clear();

    let report = reloader.reload("a").unwrap();
    assert_eq!(report.reloaded, vec!["c", "a"]);
}

#[test]
fn test_graph_rebuilt_from_new_imports() {
    let log: Log = Arc::default();
    let import_c = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&import_c);
    let loader = InitializerLoader::new()
        .module(
            ModuleDef::new("m", move |scope| {
                scope.import("b")?;
                if flag.load(Ordering::SeqCst) {
                    scope.import("c")?;
                }
                Ok(())
            })
            .path("/app/m.rs"),
        )
        .module(logged(&log, "b", &[]))
        .module(logged(&log, "c", &[]));
    let reloader = reloader_for(loader, &[]);

    reloader.runtime().import("m").unwrap();
    assert_eq!(reloader.dependencies_of("m").unwrap(), vec!["b", "c"]);

    import_c.store(false, Ordering::SeqCst);
    reloader.reload("m").unwrap();

    assert_eq!(reloader.dependencies_of("m").unwrap(), vec!["b"]);
}

#[test]
fn test_migration_hook_sees_pre_reload_state() {
    let runs = Arc::new(AtomicUsize::new(0));
    let snapshots: Arc<Mutex<Vec<StateSnapshot>>> = Arc::default();

    let body_runs = Arc::clone(&runs);
    let seen = Arc::clone(&snapshots);
    let loader = InitializerLoader::new().module(
        ModuleDef::new("m", move |scope| {
            let run = body_runs.fetch_add(1, Ordering::SeqCst) + 1;
            scope.set("runs", run);
            scope.set("cache", json!([]));

            let seen = Arc::clone(&seen);
            scope.set_migration_hook(move |snapshot, namespace| {
                seen.lock().push(snapshot.clone());
                if let Some(cache) = snapshot.get("cache") {
                    namespace.set("cache", cache.clone());
                }
            });
            Ok(())
        })
        .path("/app/m.rs"),
    );
    let reloader = reloader_for(loader, &[]);

    let module = reloader.runtime().import("m").unwrap();
    module.set("cache", json!(["warm"]));

    reloader.reload("m").unwrap();

    let snapshots = snapshots.lock();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].get("runs"), Some(&json!(1)));
    assert_eq!(snapshots[0].get("cache"), Some(&json!(["warm"])));

    assert_eq!(module.get("runs"), Some(json!(2)));
    assert_eq!(module.get("cache"), Some(json!(["warm"])));
}

#[test]
fn test_without_hook_state_is_reinitialized() {
    let loader = InitializerLoader::new().module(
        ModuleDef::new("m", |scope| {
            scope.set("greeting", "hello");
            Ok(())
        })
        .path("/app/m.rs"),
    );
    let reloader = reloader_for(loader, &[]);

    let module = reloader.runtime().import("m").unwrap();
    module.set("greeting", "patched");
    module.set("leftover", 42);

    reloader.reload("m").unwrap();

    assert_eq!(module.get("greeting"), Some(json!("hello")));
    assert!(!module.contains("leftover"));
}

#[test]
fn test_builtin_modules_are_not_dependencies() {
    let log: Log = Arc::default();
    let loader = InitializerLoader::new()
        .module(logged(&log, "app", &["sys", "util"]))
        .module(ModuleDef::new("sys", |_| Ok(())))
        .module(logged(&log, "util", &[]));
    let reloader = reloader_for(loader, &[]);

    reloader.runtime().import("app").unwrap();

    assert_eq!(reloader.dependencies_of("app").unwrap(), vec!["util"]);
}

#[test]
fn test_concurrent_imports_keep_attribution() {
    let log: Log = Arc::default();
    let mut loader = InitializerLoader::new();
    for i in 0..4 {
        let root: &'static str = Box::leak(format!("root{i}").into_boxed_str());
        let leaf: &'static str = Box::leak(format!("leaf{i}").into_boxed_str());
        let deps: &'static [&'static str] = Box::leak(vec![leaf].into_boxed_slice());
        loader = loader
            .module(logged(&log, root, deps))
            .module(logged(&log, leaf, &[]));
    }
    let reloader = reloader_for(loader, &[]);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let runtime = Arc::clone(reloader.runtime());
            std::thread::spawn(move || {
                runtime.import(&format!("root{i}")).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..4 {
        assert_eq!(
            reloader.dependencies_of(&format!("root{i}")).unwrap(),
            vec![format!("leaf{i}")]
        );
    }
    assert!(reloader.tracker().parent().is_none());
}
