use std::time::Duration;

use crate::{
    error::FeedError,
    latest::Ticket,
    model::{comment, post, NewPost, Post, PostDetail, Report},
    optimistic::LikeState,
    push::{FeedEvent, PushMessage},
};

use super::{alerts::Level, input::Action, App, AppMessage, Connection, Effect, Overlay, Screen};

fn posts_ticket(effects: &[Effect]) -> Ticket {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::LoadPosts { ticket } | Effect::Search { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("no posts request")
}

fn seeded(user_id: Option<i64>, posts: Vec<Post>) -> App {
    let mut app = App::new(user_id, false);
    let effects = app.start();
    app.update(AppMessage::Posts {
        ticket: posts_ticket(&effects),
        result: Ok(posts),
    });
    app
}

fn three_posts() -> Vec<Post> {
    let mut newest = post(3, "2024-01-03");
    newest.like_count = 5;
    newest.comment_count = 4;
    vec![post(1, "2024-01-01"), newest, post(2, "2024-01-02")]
}

fn last_level(app: &App) -> Option<Level> {
    app.alerts().last().map(|alert| alert.level)
}

#[test]
fn start_loads_posts_and_tags() {
    let mut app = App::new(None, false);
    let effects = app.start();
    assert!(matches!(effects[0], Effect::LoadPosts { .. }));
    assert!(matches!(effects[1], Effect::LoadTags { .. }));
    assert!(app.is_loading());
}

#[test]
fn seed_sorts_and_selects_newest() {
    let app = seeded(None, three_posts());
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
    assert_eq!(app.selected_post().map(|p| p.id), Some(3));
    assert!(!app.is_loading());
}

#[test]
fn failed_like_rolls_back() {
    let mut app = seeded(Some(1), three_posts());

    let effects = app.perform(Action::Like);
    assert_eq!(
        effects,
        vec![Effect::LikePost {
            post_id: 3,
            like: true
        }]
    );
    assert_eq!(app.feed().like(3), LikeState::new(6, true));

    // second press while the first is unsettled
    assert!(app.perform(Action::Like).is_empty());
    assert_eq!(app.feed().like(3), LikeState::new(6, true));

    app.update(AppMessage::PostLiked {
        post_id: 3,
        result: Err(FeedError::Network("connection reset".to_string())),
    });
    assert_eq!(app.feed().like(3), LikeState::new(5, false));
    assert!(!app.feed().like_pending(3));
    assert_eq!(last_level(&app), Some(Level::Error));
}

#[test]
fn like_settles_on_server_state() {
    let mut app = seeded(Some(1), three_posts());
    app.perform(Action::Like);
    app.update(AppMessage::PostLiked {
        post_id: 3,
        result: Ok(Some(LikeState::new(9, true))),
    });
    assert_eq!(app.feed().like(3), LikeState::new(9, true));

    app.perform(Action::Like);
    app.update(AppMessage::PostLiked {
        post_id: 3,
        result: Ok(None),
    });
    assert_eq!(app.feed().like(3), LikeState::new(8, false));
    assert!(app.alerts().is_empty());
}

#[test]
fn failed_delete_restores_post() {
    let mut app = seeded(Some(1), three_posts());

    let effects = app.perform(Action::Delete);
    assert_eq!(effects, vec![Effect::DeletePost(3)]);
    assert_eq!(app.feed_ids(), vec![2, 1]);

    app.update(AppMessage::PostDeleted {
        post_id: 3,
        result: Err(FeedError::Server {
            status: 500,
            message: "boom".to_string(),
        }),
    });
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
    assert_eq!(app.feed().like(3), LikeState::new(5, false));
    assert_eq!(app.feed().comment_count(3), 4);
    assert_eq!(last_level(&app), Some(Level::Error));
}

#[test]
fn delete_of_missing_post_counts_as_done() {
    let mut app = seeded(Some(1), three_posts());
    app.perform(Action::Delete);
    app.update(AppMessage::PostDeleted {
        post_id: 3,
        result: Err(FeedError::NotFound("gone".to_string())),
    });
    assert_eq!(app.feed_ids(), vec![2, 1]);
    assert!(app.alerts().is_empty());
}

#[test]
fn foreign_posts_cannot_be_deleted() {
    let mut app = seeded(Some(2), three_posts());
    assert!(app.perform(Action::Delete).is_empty());
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
    assert_eq!(last_level(&app), Some(Level::Error));
}

#[test]
fn stale_reload_is_discarded() {
    let mut app = App::new(None, false);
    let first = posts_ticket(&app.start());
    let second = posts_ticket(&app.perform(Action::Refresh));

    app.update(AppMessage::Posts {
        ticket: first,
        result: Ok(vec![post(9, "2024-01-09")]),
    });
    assert!(app.feed_ids().is_empty());

    app.update(AppMessage::Posts {
        ticket: second,
        result: Ok(three_posts()),
    });
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
}

#[test]
fn new_posts_wait_until_back_at_top() {
    let mut app = seeded(None, three_posts());
    app.perform(Action::Move(1));
    assert_eq!(app.selected_post().map(|p| p.id), Some(2));

    app.update(AppMessage::Push(PushMessage::Event(FeedEvent::Created(post(
        4,
        "2024-01-04",
    )))));
    assert_eq!(app.feed().pending_count(), 1);
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
    assert_eq!(app.selected_post().map(|p| p.id), Some(2));

    app.perform(Action::Top);
    assert_eq!(app.feed().pending_count(), 0);
    assert_eq!(app.feed_ids(), vec![4, 3, 2, 1]);
    assert_eq!(app.selected_post().map(|p| p.id), Some(4));
}

#[test]
fn new_post_at_top_is_shown_at_once() {
    let mut app = seeded(None, three_posts());
    app.update(AppMessage::Push(PushMessage::Event(FeedEvent::Created(post(
        4,
        "2024-01-04",
    )))));
    assert_eq!(app.feed_ids(), vec![4, 3, 2, 1]);

    // duplicate event
    app.update(AppMessage::Push(PushMessage::Event(FeedEvent::Created(post(
        4,
        "2024-01-04",
    )))));
    assert_eq!(app.feed_ids(), vec![4, 3, 2, 1]);
}

#[test]
fn detail_replies_and_comment_delete() {
    let mut app = seeded(Some(1), three_posts());

    assert_eq!(app.perform(Action::Open), vec![Effect::LoadDetail(3)]);
    assert_eq!(app.screen(), Screen::Detail);

    let mut detail_post = post(3, "2024-01-03");
    detail_post.like_count = 5;
    detail_post.comment_count = 4;
    app.update(AppMessage::Detail {
        post_id: 3,
        result: Ok(PostDetail {
            post: detail_post,
            comments: vec![comment(10, None, "first"), comment(11, None, "second")],
        }),
    });
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![10, 11]));

    assert_eq!(
        app.perform(Action::Open),
        vec![Effect::LoadReplies {
            post_id: 3,
            parent: 10
        }]
    );
    app.update(AppMessage::Replies {
        post_id: 3,
        parent: 10,
        result: Ok(vec![comment(12, Some(10), "reply")]),
    });
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![10, 12, 11]));

    assert_eq!(
        app.perform(Action::Delete),
        vec![Effect::DeleteComment {
            post_id: 3,
            comment_id: 10
        }]
    );
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![11]));

    app.update(AppMessage::CommentDeleted {
        post_id: 3,
        comment_id: 10,
        result: Ok(()),
    });
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![11]));
    assert_eq!(app.feed().comment_count(3), 2);

    app.perform(Action::Back);
    assert_eq!(app.screen(), Screen::Feed);
    assert!(app.detail().is_none());
}

#[test]
fn failed_comment_delete_restores_subtree() {
    let mut app = seeded(Some(1), three_posts());
    app.perform(Action::Open);
    app.update(AppMessage::Detail {
        post_id: 3,
        result: Ok(PostDetail {
            post: post(3, "2024-01-03"),
            comments: vec![
                comment(10, None, "first"),
                comment(12, Some(10), "reply"),
                comment(11, None, "second"),
            ],
        }),
    });
    app.perform(Action::Open);
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![10, 12, 11]));

    app.perform(Action::Delete);
    app.update(AppMessage::CommentDeleted {
        post_id: 3,
        comment_id: 10,
        result: Err(FeedError::Network("timeout".to_string())),
    });
    assert_eq!(app.detail().map(|d| d.row_ids()), Some(vec![10, 12, 11]));
    assert_eq!(last_level(&app), Some(Level::Error));
}

#[test]
fn deleted_post_closes_its_detail() {
    let mut app = seeded(None, three_posts());
    app.perform(Action::Open);
    app.update(AppMessage::Push(PushMessage::Event(FeedEvent::Deleted(3))));
    assert_eq!(app.screen(), Screen::Feed);
    assert_eq!(app.feed_ids(), vec![2, 1]);
}

#[test]
fn composer_validates_before_sending() {
    let mut app = seeded(Some(1), three_posts());
    app.perform(Action::NewPost);

    assert!(app.perform(Action::Submit).is_empty());
    match app.overlay() {
        Some(Overlay::Composer(composer)) => {
            assert_eq!(composer.error.as_deref(), Some("Invalid request: Title is required"))
        }
        other => panic!("unexpected overlay {:?}", other),
    }

    for c in "Hi".chars() {
        app.perform(Action::Type(c));
    }
    app.perform(Action::NextField);
    app.perform(Action::Type('x'));
    let effects = app.perform(Action::Submit);
    assert_eq!(
        effects,
        vec![Effect::SavePost {
            editing: None,
            post: NewPost {
                title: "Hi".to_string(),
                content: "x".to_string(),
                ..NewPost::default()
            },
        }]
    );

    // no double submit while waiting
    assert!(app.perform(Action::Submit).is_empty());

    app.update(AppMessage::PostSaved {
        editing: None,
        result: Ok(Some(post(4, "2024-01-04"))),
    });
    assert!(app.overlay().is_none());
    assert_eq!(app.feed_ids(), vec![4, 3, 2, 1]);
    assert_eq!(last_level(&app), Some(Level::Info));
}

#[test]
fn server_rejection_stays_in_composer() {
    let mut app = seeded(Some(1), three_posts());
    app.perform(Action::Report);
    for c in "spam".chars() {
        app.perform(Action::Type(c));
    }
    app.perform(Action::NextField);
    for c in "me@example.com".chars() {
        app.perform(Action::Type(c));
    }
    assert_eq!(app.perform(Action::Submit).len(), 1);

    app.update(AppMessage::Reported {
        post_id: 3,
        result: Err(FeedError::Validation("Reason too short".to_string())),
    });
    match app.overlay() {
        Some(Overlay::Composer(composer)) => {
            assert!(!composer.submitting);
            assert!(composer.error.is_some());
        }
        other => panic!("unexpected overlay {:?}", other),
    }
}

#[test]
fn filter_searches_the_server() {
    let mut app = seeded(None, three_posts());
    app.perform(Action::Filter);
    for c in "post 2".chars() {
        app.perform(Action::Type(c));
    }
    // local preview while typing
    assert_eq!(app.feed_ids(), vec![2]);

    let effects = app.perform(Action::Enter);
    assert!(app.overlay().is_none());
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::Search { filter, .. } if filter.text.as_deref() == Some("post 2")
    )));

    let effects = app.perform(Action::ClearFilter);
    assert!(matches!(effects[0], Effect::LoadPosts { .. }));
    assert_eq!(app.feed_ids(), vec![3, 2, 1]);
}

#[test]
fn reconnect_reloads_the_feed() {
    let mut app = seeded(None, three_posts());
    assert!(app.update(AppMessage::Push(PushMessage::Connected)).is_empty());
    assert_eq!(app.connection(), Connection::Online);

    app.update(AppMessage::Push(PushMessage::Disconnected {
        reason: "closed".to_string(),
        retry_in: Duration::from_secs(2),
    }));
    assert_eq!(
        app.connection(),
        Connection::Offline {
            retry_in: Duration::from_secs(2)
        }
    );

    let effects = app.update(AppMessage::Push(PushMessage::Connected));
    assert!(matches!(effects[0], Effect::LoadPosts { .. }));
    assert_eq!(effects.len(), 2);
}

#[test]
fn moderation_needs_admin() {
    let mut app = seeded(None, three_posts());
    assert!(app.perform(Action::Moderation).is_empty());
    assert_eq!(app.screen(), Screen::Feed);
    assert_eq!(last_level(&app), Some(Level::Error));
}

#[test]
fn moderation_delete_rolls_back() {
    let mut app = App::new(None, true);
    assert_eq!(app.perform(Action::Moderation), vec![Effect::LoadReports]);
    assert_eq!(app.screen(), Screen::Reports);

    let report = |post_id, reason: &str| Report {
        post_id,
        user_id: None,
        reason: reason.to_string(),
        email: None,
        created_at: None,
    };
    app.update(AppMessage::Reports(Ok(vec![
        report(7, "spam"),
        report(8, "rude"),
        report(7, "scam"),
    ])));
    assert_eq!(app.moderation().ids(), vec![7, 8]);

    assert_eq!(app.perform(Action::Delete), vec![Effect::DeletePost(7)]);
    assert_eq!(app.moderation().ids(), vec![8]);

    app.update(AppMessage::PostDeleted {
        post_id: 7,
        result: Err(FeedError::Unauthorized),
    });
    assert_eq!(app.moderation().ids(), vec![7, 8]);
}

#[test]
fn post_outside_feed_is_deleted_once() {
    let mut app = App::new(None, true);
    app.perform(Action::Moderation);
    app.update(AppMessage::Reports(Ok(vec![Report {
        post_id: 7,
        user_id: None,
        reason: "spam".to_string(),
        email: None,
        created_at: None,
    }])));

    assert_eq!(app.perform(Action::Open), vec![Effect::LoadDetail(7)]);
    app.update(AppMessage::Detail {
        post_id: 7,
        result: Ok(PostDetail {
            post: post(7, "2024-01-07"),
            comments: vec![],
        }),
    });

    assert_eq!(app.perform(Action::DeletePost), vec![Effect::DeletePost(7)]);
    assert!(app.perform(Action::DeletePost).is_empty());

    app.update(AppMessage::PostDeleted {
        post_id: 7,
        result: Err(FeedError::Server {
            status: 503,
            message: "busy".to_string(),
        }),
    });
    assert_eq!(app.moderation().ids(), vec![7]);
    assert_eq!(app.perform(Action::DeletePost), vec![Effect::DeletePost(7)]);
}
