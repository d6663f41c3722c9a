use std::time::Duration;

use thermal_scout::blackboard::snapshot;
use thermal_scout::{AppContext, Settings};

fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.simulation.seed = Some(7);
    settings.simulation.period_ms = 5;
    settings.publish.map_snapshot_ticks = 2;
    settings.publish.status_log_secs = 0;
    settings
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fleet_runs_and_publishes() {
    let app = AppContext::start_with(fast_settings(), None).unwrap();
    let mut fleet = app.fleet_topic.latest();
    let mut maps = app.map_topic.latest();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let snap = fleet.get().expect("fleet snapshot");
    assert!(snap.tick >= 4);
    assert_eq!(snap.agents.len(), 1);
    assert!(snap.agents[0].distance_travelled_m > 0.0);
    assert_eq!(snap.agents[0].room_id.as_deref(), Some("floor_8"));

    let map = maps.get().expect("map snapshot");
    assert!(!map.heat.cells.is_empty());
    assert!(!map.agents[0].trail.is_empty());

    let health = snapshot(&app.bb);
    assert!(health.ticks >= snap.tick);
    app.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_agents_share_heat_map() {
    let mut settings = fast_settings();
    settings.agents = Settings::from_toml_str(include_str!("../config/default.toml")).unwrap().agents;
    let app = AppContext::start_with(settings, None).unwrap();
    let mut fleet = app.fleet_topic.latest();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snap = fleet.get().expect("fleet snapshot");
    assert_eq!(snap.agents.len(), 2);
    assert_eq!(snap.agents[0].name, "scout-1");
    assert!(snap.agents[0].waypoint.is_some());
    assert!(snap.agents[1].waypoint.is_none());

    app.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshots_serialize_to_json() {
    let app = AppContext::start_with(fast_settings(), None).unwrap();
    let mut fleet = app.fleet_topic.latest();
    let mut maps = app.map_topic.latest();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let json = serde_json::to_value(&*fleet.get().unwrap()).unwrap();
    assert!(json["agents"][0]["pose"]["x"].is_number());
    let json = serde_json::to_value(&*maps.get().unwrap()).unwrap();
    assert!(json["heat"]["rows"].as_u64() == Some(40));

    app.shutdown().await.unwrap();
}
