//! Serde roundtrip and JsonSchema validation tests for all wire types.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use schemars::schema_for;
use sbs_core::aggregate::*;
use sbs_core::entities::*;
use sbs_core::enums::*;
use sbs_core::listen::{ActionQuery, ListenerQuery};
use sbs_core::search::*;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            // Serde roundtrip
            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            // Schema validation
            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, day, 12, 30, 0).unwrap()
}

fn view(id: i64) -> ViewRecord {
    ViewRecord {
        id,
        create_date: at(1),
    }
}

fn edit(id: i64) -> EditRecord {
    EditRecord {
        view: view(id),
        edit_date: at(2),
        create_user_id: 5,
        edit_user_id: 6,
    }
}

fn controlled(id: i64, parent_id: i64) -> ControlRecord {
    ControlRecord {
        entity: edit(id),
        parent_id,
        permissions: BTreeMap::from([(0, "R".to_string()), (5, "CRUD".to_string())]),
        my_perms: "R".into(),
    }
}

fn named(id: i64, parent_id: i64, name: &str) -> NamedRecord {
    NamedRecord {
        controlled: controlled(id, parent_id),
        name: name.into(),
        values: BTreeMap::from([("pinned".to_string(), "1".to_string())]),
    }
}

fn aggregate(count: i64) -> Aggregate {
    if count == 0 {
        Aggregate::default()
    } else {
        Aggregate {
            first_post: Some(at(3)),
            last_post: Some(at(9)),
            count,
        }
    }
}

roundtrip_and_validate!(
    user_roundtrip,
    User,
    User {
        view: view(5),
        username: "12Me21".into(),
        avatar: 77,
    }
);

roundtrip_and_validate!(
    user_self_roundtrip,
    UserSelf,
    UserSelf {
        user: User {
            view: view(6),
            username: "snail_".into(),
            avatar: 0,
        },
        email: "snail@example.com".into(),
        super_user: true,
    }
);

roundtrip_and_validate!(
    category_roundtrip,
    Category,
    Category {
        named: named(10, 1, "Programs"),
        description: "Share what you made".into(),
        local_supers: vec![5, 6],
    }
);

roundtrip_and_validate!(
    content_roundtrip,
    Content,
    Content {
        named: named(300, 10, "Tetris clone"),
        content: "Falling blocks.".into(),
        kind: "program".into(),
        keywords: vec!["puzzle".into()],
        about: ContentAbout {
            comments: aggregate(4),
            watches: aggregate(0),
            votes: BTreeMap::from([(VoteType::Great, aggregate(2)), (VoteType::Bad, aggregate(0))]),
            watching: true,
            my_vote: Some(VoteType::Okay),
        },
    }
);

roundtrip_and_validate!(
    comment_roundtrip,
    Comment,
    Comment {
        entity: edit(9001),
        parent_id: 300,
        content: "Nice game!".into(),
        deleted: false,
    }
);

roundtrip_and_validate!(
    file_roundtrip,
    File,
    File {
        controlled: controlled(77, 0),
        name: "avatar.png".into(),
        file_type: "image/png".into(),
    }
);

roundtrip_and_validate!(
    vote_roundtrip,
    Vote,
    Vote {
        view: view(400),
        user_id: 5,
        content_id: 300,
        vote: None,
    }
);

roundtrip_and_validate!(
    watch_roundtrip,
    Watch,
    Watch {
        view: view(401),
        user_id: 5,
        content_id: 300,
        last_notification_id: 1234,
    }
);

roundtrip_and_validate!(
    event_roundtrip,
    Event,
    Event {
        id: 1235,
        date: at(5),
        user_id: 5,
        content_id: 9001,
        kind: EntityType::Comment,
        content_type: String::new(),
        action: CrudAction::Create,
        extra: String::new(),
    }
);

roundtrip_and_validate!(
    comment_aggregate_roundtrip,
    CommentAggregate,
    CommentAggregate {
        aggregate: aggregate(3),
        id: 300,
        user_ids: vec![5, 6],
    }
);

roundtrip_and_validate!(
    activity_aggregate_roundtrip,
    ActivityAggregate,
    ActivityAggregate {
        aggregate: aggregate(0),
        id: 300,
        user_ids: vec![],
        last_id: 0,
    }
);

roundtrip_and_validate!(
    action_query_roundtrip,
    ActionQuery,
    ActionQuery {
        last_id: 1235,
        statuses: BTreeMap::from([("300".to_string(), "active".to_string())]),
        chains: vec!["300".into()],
    }
);

roundtrip_and_validate!(
    listener_query_roundtrip,
    ListenerQuery,
    ListenerQuery {
        last_listeners: BTreeMap::from([(
            "300".to_string(),
            BTreeMap::from([("5".to_string(), serde_json::json!("idle"))]),
        )]),
        chains: vec![],
    }
);

roundtrip_and_validate!(
    content_search_roundtrip,
    ContentSearch,
    ContentSearch {
        base: EntitySearch::by_ids([1, 2]).limit(10),
        parent_ids: vec![10],
        kind: Some("program".into()),
        keyword: Some("puzzle".into()),
        name_like: None,
    }
);
