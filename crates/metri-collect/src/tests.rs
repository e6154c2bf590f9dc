use crate::application::DirectMetric;
use crate::error::CollectError;
use crate::publisher::memory::MemoryPublisher;
use crate::publisher::{batches, MAX_BATCH_SIZE};
use crate::registry::Registry;
use crate::runner::Runner;
use chrono::{TimeZone, Utc};
use metri_common::types::{Dimension, MetricSample, Unit};
use metri_watch::registry::WatchStatus;
use metri_watch::spec::{WatchConfig, WatchSpec};
use metri_watch::statistic::Statistic;
use metri_watch::WatchEvaluator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    registry: Registry,
    publisher: Arc<MemoryPublisher>,
    watcher: Arc<WatchEvaluator>,
    users: Arc<AtomicU64>,
}

fn fixture() -> Fixture {
    let publisher = Arc::new(MemoryPublisher::new());
    let watcher = Arc::new(WatchEvaluator::new());
    let users = Arc::new(AtomicU64::new(50));
    let total_users = Arc::clone(&users);

    let registry = Registry::builder()
        .publisher("test", publisher.clone())
        .watcher("test", watcher.clone())
        .template("instance", |m| {
            m.dimension("InstanceId", "i-123456");
        })
        .application("CareerArc", move |app| {
            app.publishers(["test"]).watchers(["test"]).metrics(|root| {
                root.namespace("Application", |ns| {
                    ns.namespace("Users", |ns| {
                        let total = Arc::clone(&total_users);
                        ns.metric("Total", move |m| {
                            m.value(total.load(Ordering::SeqCst) as f64);
                            Ok(())
                        });
                        ns.metric("Active", |m| {
                            m.value(25);
                            Ok(())
                        });
                    });
                });
                root.namespace("Unicorn", |ns| {
                    ns.metric("WorkerCount", |m| {
                        m.value(4);
                        Ok(())
                    });
                    ns.group("Requests", |g| {
                        g.metric().value(3).dimension("Type", "Active");
                        g.metric().value(7).dimension("Type", "Queued");
                        Ok(())
                    });
                });
            });
        })
        .application("CareerBeam", |app| {
            app.publishers(["test"]).metrics(|root| {
                root.namespace("System", |ns| {
                    ns.metric("LoadAverage", |m| {
                        m.value(0.75);
                        Ok(())
                    });
                    ns.namespace("Memory", |ns| {
                        ns.metric("Used", |m| {
                            m.value(3000).unit(Unit::Megabytes);
                            Ok(())
                        });
                        ns.metric("Free", |m| {
                            m.name("FreeMemory")
                                .namespace("CareerBeam/System/FreeMemory")
                                .value(2000)
                                .unit(Unit::Megabytes)
                                .dimensions([("Type", "Free"), ("SystemId", "Workstation-1")])
                                .timestamp(Utc.timestamp_opt(0, 0).unwrap());
                            Ok(())
                        });
                    });
                });
            });
        })
        .application("Namespace", |app| {
            app.publishers(["test"])
                .prefix_metrics_with("development")
                .metrics(|root| {
                    root.namespace("System", |ns| {
                        ns.metric("LoadAverage", |m| {
                            m.value(0.25);
                            Ok(())
                        });
                    });
                });
        })
        .application("Template", |app| {
            app.publishers(["test"]).metrics(|root| {
                root.metric("Instance", |m| {
                    m.template("instance").value(25).dimension("Type", "Specific");
                    Ok(())
                });
                root.group("InstanceGroup", |g| {
                    g.metric().template("instance").value(10).dimension("Type", "Group");
                    Ok(())
                });
            });
        })
        .application("Watchers", |app| {
            app.watchers(["test"]).metrics(|root| {
                root.metric("Errors", |m| {
                    m.value(1).watch(
                        WatchSpec::builder("Error Rate Too High")
                            .description("Triggered when the Application error rate is too high")
                            .condition(Statistic::Sum.over_period(3600).gt(10.0))
                            .build()?,
                    );
                    Ok(())
                });
            });
        })
        .build()
        .unwrap();

    Fixture {
        registry,
        publisher,
        watcher,
        users,
    }
}

fn dims(pairs: &[(&str, &str)]) -> Vec<Dimension> {
    pairs.iter().map(|(k, v)| Dimension::new(*k, *v)).collect()
}

#[test]
fn nested_namespaces_and_groups() {
    let fx = fixture();
    let app = fx.registry.application("CareerArc").unwrap();
    let metrics = app.metrics().unwrap();
    assert_eq!(metrics.len(), 5);
    let (total, active, workers, active_requests, queued_requests) =
        (&metrics[0], &metrics[1], &metrics[2], &metrics[3], &metrics[4]);

    assert_eq!(total.value(), 50.0);
    assert_eq!(total.name(), "Total");
    assert_eq!(total.namespace(), "CareerArc/Application/Users");
    assert_eq!(total.unit(), Unit::Count);

    assert_eq!(active.value(), 25.0);
    assert_eq!(active.namespace(), "CareerArc/Application/Users");

    assert_eq!(workers.namespace(), "CareerArc/Unicorn");

    assert_eq!(active_requests.name(), "Requests");
    assert_eq!(active_requests.namespace(), "CareerArc/Unicorn");
    assert_eq!(active_requests.dimensions(), dims(&[("Type", "Active")]));
    assert_eq!(queued_requests.name(), "Requests");
    assert_eq!(queued_requests.dimensions(), dims(&[("Type", "Queued")]));
    assert_eq!(active_requests.timestamp(), queued_requests.timestamp());

    fx.users.store(10, Ordering::SeqCst);
    assert_eq!(app.metrics().unwrap()[0].value(), 10.0);
}

#[test]
fn body_overrides_name_namespace_and_timestamp() {
    let fx = fixture();
    let metrics = fx.registry.application("CareerBeam").unwrap().metrics().unwrap();
    let (load, used, free) = (&metrics[0], &metrics[1], &metrics[2]);

    assert_eq!(load.value(), 0.75);
    assert_eq!(load.namespace(), "CareerBeam/System");

    assert_eq!(used.namespace(), "CareerBeam/System/Memory");
    assert_eq!(used.unit(), Unit::Megabytes);

    assert_eq!(free.name(), "FreeMemory");
    assert_eq!(free.namespace(), "CareerBeam/System/FreeMemory");
    assert_eq!(free.unit(), Unit::Megabytes);
    assert_eq!(free.timestamp(), Utc.timestamp_opt(0, 0).unwrap());
    assert_eq!(
        free.dimensions(),
        dims(&[("Type", "Free"), ("SystemId", "Workstation-1")])
    );
}

#[test]
fn prefix_lands_after_application_name() {
    let fx = fixture();
    let metrics = fx.registry.application("Namespace").unwrap().metrics().unwrap();
    assert_eq!(metrics[0].name(), "LoadAverage");
    assert_eq!(metrics[0].namespace(), "Namespace/development/System");
    assert_eq!(metrics[0].value(), 0.25);
}

#[test]
fn templates_append_dimensions() {
    let fx = fixture();
    let metrics = fx.registry.application("Template").unwrap().metrics().unwrap();
    let (instance, group) = (&metrics[0], &metrics[1]);

    assert_eq!(instance.name(), "Instance");
    assert_eq!(instance.namespace(), "Template");
    assert_eq!(instance.value(), 25.0);
    assert_eq!(
        instance.dimensions(),
        dims(&[("Type", "Specific"), ("InstanceId", "i-123456")])
    );

    assert_eq!(group.name(), "InstanceGroup");
    assert_eq!(group.namespace(), "Template");
    assert_eq!(
        group.dimensions(),
        dims(&[("Type", "Group"), ("InstanceId", "i-123456")])
    );
}

#[tokio::test]
async fn publish_one_then_all() {
    let fx = fixture();
    let app = fx.registry.application("CareerArc").unwrap();
    let metrics = app.metrics().unwrap();
    let (total, active) = (&metrics[0], &metrics[1]);

    app.publish(std::slice::from_ref(total)).await.unwrap();
    assert!(fx.publisher.is_published(total));
    assert!(!fx.publisher.is_published(active));

    fx.publisher.clear();
    let count = app.publish_all(None).await.unwrap();
    assert_eq!(count, 5);
    let names: Vec<String> = fx.publisher.published().iter().map(|m| m.name().to_string()).collect();
    assert!(names.contains(&"Total".to_string()));
    assert!(names.contains(&"Active".to_string()));
}

fn heartbeat(timestamp: chrono::DateTime<Utc>) -> DirectMetric {
    DirectMetric {
        namespace: "CareerArc/Counters".into(),
        name: "aae:heartbeat".into(),
        value: 1.0,
        unit: Unit::Count,
        timestamp: Some(timestamp),
        dimensions: Vec::new(),
        template: None,
        watches: Vec::new(),
    }
}

#[tokio::test]
async fn direct_publish() {
    let fx = fixture();
    let timestamp = Utc::now();

    fx.registry
        .application("Namespace")
        .unwrap()
        .publish_direct(heartbeat(timestamp))
        .await
        .unwrap();
    let metric = fx.publisher.last().unwrap();
    assert_eq!(metric.namespace(), "CareerArc/development/Counters");
    assert_eq!(metric.name(), "aae:heartbeat");
    assert_eq!(metric.value(), 1.0);
    assert_eq!(metric.timestamp(), timestamp);
    assert_eq!(metric.unit(), Unit::Count);

    let mut options = heartbeat(timestamp);
    options.template = Some("instance".into());
    let career_arc = fx.registry.application("CareerArc").unwrap();
    career_arc.publish_direct(options).await.unwrap();
    let metric = fx.publisher.last().unwrap();
    assert_eq!(metric.namespace(), "CareerArc/Counters");
    assert_eq!(metric.dimensions(), dims(&[("InstanceId", "i-123456")]));

    career_arc
        .publish_with(|m| {
            m.name("Direct Block Count")
                .namespace("CareerArc/Counters")
                .value(10)
                .unit(Unit::Count)
                .timestamp(timestamp);
            Ok(())
        })
        .await
        .unwrap();
    let metric = fx.publisher.last().unwrap();
    assert_eq!(metric.name(), "Direct Block Count");
    assert_eq!(metric.namespace(), "CareerArc/Counters");
    assert_eq!(metric.value(), 10.0);
    assert_eq!(metric.timestamp(), timestamp);
}

#[tokio::test]
async fn direct_publish_with_unknown_template_fails() {
    let fx = fixture();
    let mut options = heartbeat(Utc::now());
    options.template = Some("nope".into());
    let err = fx
        .registry
        .application("CareerArc")
        .unwrap()
        .publish_direct(options)
        .await
        .unwrap_err();
    assert!(matches!(err, CollectError::UnknownTemplate(name) if name == "nope"));
    assert!(fx.publisher.is_empty());
}

#[test]
fn declared_watch_triggers_on_eleventh_pass() {
    let fx = fixture();
    let app = fx.registry.application("Watchers").unwrap();

    let results: Vec<WatchStatus> = (0..10)
        .map(|_| {
            let metrics = app.metrics().unwrap();
            app.watch(&metrics);
            fx.watcher.status("Error Rate Too High")
        })
        .collect();
    assert_eq!(results.iter().filter(|s| **s != WatchStatus::Ok).count(), 0);

    let metrics = app.metrics().unwrap();
    app.watch(&metrics);
    assert_eq!(fx.watcher.status("Error Rate Too High"), WatchStatus::Triggered);
}

#[tokio::test]
async fn direct_publish_watches() {
    let fx = fixture();
    let app = fx.registry.application("Watchers").unwrap();
    let watch_name = "Queued Distributions Alarm";
    let mut options = heartbeat(Utc::now());
    options.name = "ade:dispatcher:distribution:queued".into();
    options.watches = vec![WatchConfig {
        name: watch_name.into(),
        description: "Triggered when there are too many queued distributions".into(),
        statistic: "sum".into(),
        period: 3600,
        evaluations: 1,
        comparison: ">".into(),
        threshold: 10.0,
    }];

    let mut results = Vec::new();
    for _ in 0..10 {
        app.publish_direct(options.clone()).await.unwrap();
        results.push(fx.watcher.status(watch_name));
    }
    assert!(results.iter().all(|s| *s == WatchStatus::Ok));

    app.publish_direct(options).await.unwrap();
    assert_eq!(fx.watcher.status(watch_name), WatchStatus::Triggered);
}

#[tokio::test]
async fn direct_publish_rejects_invalid_watch() {
    let fx = fixture();
    let json = serde_json::json!({
        "namespace": "CareerArc/Counters",
        "name": "queued",
        "value": 1,
        "watches": [{
            "name": "Broken",
            "statistic": "sum",
            "period": 0,
            "comparison": ">",
            "threshold": 10
        }]
    });
    let options: DirectMetric = serde_json::from_value(json).unwrap();
    assert_eq!(options.unit, Unit::Count);

    let err = fx
        .registry
        .application("Watchers")
        .unwrap()
        .publish_direct(options)
        .await
        .unwrap_err();
    assert!(matches!(err, CollectError::Watch(_)));
    assert_eq!(fx.watcher.status("Broken"), WatchStatus::Ok);
}

#[test]
fn roles_filter_groups_only() {
    let registry = Registry::builder()
        .application("Roles", |app| {
            app.metrics(|root| {
                root.metric("Always", |m| {
                    m.value(1);
                    Ok(())
                });
                root.group_for_roles("WebOnly", ["web"], |g| {
                    g.metric().value(2);
                    Ok(())
                });
                root.group("Everywhere", |g| {
                    g.metric().value(3);
                    Ok(())
                });
            });
        })
        .build()
        .unwrap();
    let app = registry.application("Roles").unwrap();

    let names = |metrics: Vec<crate::Metric>| -> Vec<String> {
        metrics.iter().map(|m| m.name().to_string()).collect()
    };
    assert_eq!(
        names(app.metrics_for_roles(&["web".to_string()]).unwrap()),
        vec!["Always", "WebOnly", "Everywhere"]
    );
    assert_eq!(
        names(app.metrics_for_roles(&["db".to_string()]).unwrap()),
        vec!["Always", "Everywhere"]
    );
    assert_eq!(app.metrics().unwrap().len(), 3);
}

#[test]
fn failing_definition_does_not_stop_the_pass() {
    let registry = Registry::builder()
        .application("Flaky", |app| {
            app.metrics(|root| {
                root.metric("Broken", |_| Err(anyhow::anyhow!("socket unavailable")));
                root.metric("Fine", |m| {
                    m.value(1);
                    Ok(())
                });
            });
        })
        .build()
        .unwrap();
    let app = registry.application("Flaky").unwrap();

    let collection = app.collect(None);
    assert_eq!(collection.metrics.len(), 1);
    assert_eq!(collection.metrics[0].name(), "Fine");
    assert!(matches!(
        &collection.errors[0],
        CollectError::Definition { metric, .. } if metric == "Broken"
    ));
    assert!(app.metrics().is_err());
}

#[test]
fn build_rejects_unknown_names() {
    let err = Registry::builder()
        .application("App", |app| {
            app.publishers(["missing"]);
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, CollectError::UnknownPublisher(name) if name == "missing"));

    let err = Registry::builder()
        .application("App", |app| {
            app.watchers(["missing"]);
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, CollectError::UnknownWatcher(_)));

    let err = Registry::builder()
        .application("App", |_| {})
        .application("App", |_| {})
        .build()
        .unwrap_err();
    assert!(matches!(err, CollectError::DuplicateApplication(_)));

    let registry = Registry::builder().build().unwrap();
    assert!(matches!(
        registry.application("Nope"),
        Err(CollectError::UnknownApplication(_))
    ));
}

fn sample(namespace: &str, i: usize) -> MetricSample {
    MetricSample::new(
        namespace,
        format!("Metric{i}"),
        i as f64,
        Unit::Count,
        Utc.timestamp_opt(0, 0).unwrap(),
        Vec::new(),
    )
}

#[test]
fn batches_group_by_namespace_and_size() {
    let one = vec![sample("App", 0)];
    let grouped = batches(&one, MAX_BATCH_SIZE);
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].metrics, vec![&one[0]]);

    let many: Vec<MetricSample> = (0..45).map(|i| sample("App", i)).collect();
    let sizes: Vec<usize> = batches(&many, MAX_BATCH_SIZE)
        .iter()
        .map(|b| b.metrics.len())
        .collect();
    assert_eq!(sizes, vec![20, 20, 5]);

    let mixed = vec![sample("A", 0), sample("B", 1), sample("A", 2)];
    let grouped = batches(&mixed, MAX_BATCH_SIZE);
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[0].namespace, "A");
    assert_eq!(grouped[0].metrics.len(), 2);
    assert_eq!(grouped[1].namespace, "B");
}

#[tokio::test(start_paused = true)]
async fn runner_stops_after_iterations() {
    let fx = fixture();
    let app = fx.registry.application("Namespace").unwrap();
    let runner = Runner::new(app, Duration::from_secs(5), Some(3));

    assert_eq!(runner.start().await, 3);
    assert_eq!(fx.publisher.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn runner_stops_on_shutdown() {
    let fx = fixture();
    let app = fx.registry.application("Namespace").unwrap();
    let runner = Runner::new(app, Duration::from_secs(5), None);

    let passes = runner
        .run_until(tokio::time::sleep(Duration::from_secs(12)))
        .await;
    assert_eq!(passes, 3);
    assert_eq!(fx.publisher.len(), 3);
}

#[tokio::test]
async fn publish_evaluates_declared_watches() {
    let fx = fixture();
    let app = fx.registry.application("Watchers").unwrap();

    for _ in 0..10 {
        let metrics = app.metrics().unwrap();
        app.publish(&metrics).await.unwrap();
    }
    assert_eq!(fx.watcher.status("Error Rate Too High"), WatchStatus::Ok);

    let metrics = app.metrics().unwrap();
    app.publish(&metrics).await.unwrap();
    assert_eq!(fx.watcher.status("Error Rate Too High"), WatchStatus::Triggered);
    // no publishers configured for this application
    assert!(fx.publisher.is_empty());
}
