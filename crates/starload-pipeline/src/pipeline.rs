//! The fixed star-schema load pipeline.

use std::sync::Arc;

use starload_tasks::tasks::{
    DataFormat, DataQualityTask, LoadDimensionTask, LoadFactTask, MarkerTask, StageTask, TableCheck,
};

use crate::config::StagingConfig;
use crate::graph::TaskGraph;
use crate::queries;

/// Tables covered by the post-load quality checks, with their key columns.
pub fn quality_checks() -> Vec<TableCheck> {
    vec![
        TableCheck::new("songplays", "playid"),
        TableCheck::new("users", "userid"),
        TableCheck::new("songs", "songid"),
        TableCheck::new("artists", "artistid"),
        TableCheck::new("time", "start_time"),
    ]
}

/// Build the hourly load graph:
///
/// begin → staging (parallel) → fact load → dimension loads (parallel) →
/// quality checks → finish.
pub fn build_graph(staging: &StagingConfig) -> TaskGraph {
    let mut graph = TaskGraph::new();

    let begin = graph.add_node(Arc::new(MarkerTask::new("begin")));

    let stage_events = graph.add_node(Arc::new(StageTask::new(
        "stage_events",
        "staging_events",
        &staging.bucket,
        &staging.events_prefix,
        staging.events_format(),
    )));
    let stage_songs = graph.add_node(Arc::new(StageTask::new(
        "stage_songs",
        "staging_songs",
        &staging.bucket,
        &staging.songs_prefix,
        DataFormat::JsonAuto,
    )));

    let load_songplays = graph.add_node(Arc::new(LoadFactTask::new(
        "load_songplays_fact",
        "songplays",
        queries::SONGPLAY_TABLE_INSERT,
    )));

    let load_users = graph.add_node(Arc::new(LoadDimensionTask::new(
        "load_user_dim",
        "users",
        queries::USER_TABLE_INSERT,
        staging.is_append_only("users"),
    )));
    let load_songs = graph.add_node(Arc::new(LoadDimensionTask::new(
        "load_song_dim",
        "songs",
        queries::SONG_TABLE_INSERT,
        staging.is_append_only("songs"),
    )));
    let load_artists = graph.add_node(Arc::new(LoadDimensionTask::new(
        "load_artist_dim",
        "artists",
        queries::ARTIST_TABLE_INSERT,
        staging.is_append_only("artists"),
    )));
    let load_time = graph.add_node(Arc::new(LoadDimensionTask::new(
        "load_time_dim",
        "time",
        queries::TIME_TABLE_INSERT,
        staging.is_append_only("time"),
    )));

    let quality = graph.add_node(Arc::new(DataQualityTask::new(
        "quality_checks",
        quality_checks(),
    )));

    let finish = graph.add_node(Arc::new(MarkerTask::new("finish")));

    let dimensions = [load_users, load_songs, load_artists, load_time];

    graph.add_fan(&[begin], &[stage_events, stage_songs]);
    graph.add_fan(&[stage_events, stage_songs], &[load_songplays]);
    graph.add_fan(&[load_songplays], &dimensions);
    graph.add_fan(&dimensions, &[quality]);
    graph.add_edge(quality, finish);

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    fn make_staging() -> StagingConfig {
        StagingConfig {
            bucket: "events-lake".to_string(),
            ..StagingConfig::default()
        }
    }

    fn id_of(graph: &TaskGraph, name: &str) -> NodeId {
        graph
            .node_ids()
            .find(|id| graph.node_name(*id) == name)
            .unwrap()
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|n| *n == id).unwrap()
    }

    #[test]
    fn test_graph_is_valid() {
        let graph = build_graph(&make_staging());
        assert!(graph.validate().is_ok());
        assert_eq!(graph.node_count(), 10);
    }

    #[test]
    fn test_graph_node_names() {
        let graph = build_graph(&make_staging());
        let names: Vec<&str> = graph.node_ids().map(|id| graph.node_name(id)).collect();
        for expected in [
            "begin",
            "stage_events",
            "stage_songs",
            "load_songplays_fact",
            "load_user_dim",
            "load_song_dim",
            "load_artist_dim",
            "load_time_dim",
            "quality_checks",
            "finish",
        ] {
            assert!(names.contains(&expected), "missing node {}", expected);
        }
    }

    #[test]
    fn test_fact_depends_on_both_staging_nodes() {
        let graph = build_graph(&make_staging());
        let fact = id_of(&graph, "load_songplays_fact");
        let upstream: Vec<&str> = graph
            .upstream(fact)
            .into_iter()
            .map(|id| graph.node_name(id))
            .collect();
        assert_eq!(upstream, vec!["stage_events", "stage_songs"]);
    }

    #[test]
    fn test_quality_depends_on_all_dimensions() {
        let graph = build_graph(&make_staging());
        let quality = id_of(&graph, "quality_checks");
        let upstream: Vec<&str> = graph
            .upstream(quality)
            .into_iter()
            .map(|id| graph.node_name(id))
            .collect();
        assert_eq!(
            upstream,
            vec![
                "load_user_dim",
                "load_song_dim",
                "load_artist_dim",
                "load_time_dim"
            ]
        );
    }

    #[test]
    fn test_topological_order_matches_stages() {
        let graph = build_graph(&make_staging());
        let order = graph.topological_order().unwrap();

        let begin = id_of(&graph, "begin");
        let fact = id_of(&graph, "load_songplays_fact");
        let quality = id_of(&graph, "quality_checks");
        let finish = id_of(&graph, "finish");

        assert!(position(&order, begin) < position(&order, fact));
        for staging in ["stage_events", "stage_songs"] {
            assert!(position(&order, id_of(&graph, staging)) < position(&order, fact));
        }
        for dim in [
            "load_user_dim",
            "load_song_dim",
            "load_artist_dim",
            "load_time_dim",
        ] {
            let dim_id = id_of(&graph, dim);
            assert!(position(&order, fact) < position(&order, dim_id));
            assert!(position(&order, dim_id) < position(&order, quality));
        }
        assert!(position(&order, quality) < position(&order, finish));
        assert_eq!(position(&order, finish), order.len() - 1);
    }

    #[test]
    fn test_quality_checks_cover_exactly_the_five_tables() {
        let checks = quality_checks();
        let tables: Vec<&str> = checks.iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["songplays", "users", "songs", "artists", "time"]);
        assert!(checks.iter().all(|c| c.key_column.is_some()));
    }
}
