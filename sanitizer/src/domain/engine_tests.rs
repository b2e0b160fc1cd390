//! Tests for the sanitization engine.

use std::sync::{Arc, Mutex};

use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::MockRecordStore;
use crate::domain::{CommentId, HookPoint, UserId};
use crate::outbound::{InMemoryRecordStore, MAIN_SITE};
use crate::test_support::{SequenceProvider, sample_comment, sample_user};

type Events = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingProgress {
    events: Events,
}

impl ProgressReporter for RecordingProgress {
    fn start(&mut self, label: &str, total: usize) {
        self.events
            .lock()
            .expect("progress log")
            .push(format!("start {label} {total}"));
    }

    fn tick(&mut self) {
        self.events.lock().expect("progress log").push("tick".to_owned());
    }

    fn finish(&mut self) {
        self.events
            .lock()
            .expect("progress log")
            .push("finish".to_owned());
    }
}

fn engine<S: RecordStore + ?Sized>(store: Arc<S>) -> SanitizationEngine<S> {
    SanitizationEngine::new(store, Box::new(SequenceProvider::new()))
}

fn plan(store: &dyn RecordStore, keep: Option<&str>, site: Option<&str>) -> RunPlan {
    RunPlan::prepare(
        store,
        &RunOptions {
            keep: keep.map(str::to_owned),
            policy: NotFoundPolicy::Strict,
            site: site.map(str::to_owned),
        },
    )
    .expect("valid plan")
}

#[fixture]
fn blog() -> Arc<InMemoryRecordStore> {
    Arc::new(
        InMemoryRecordStore::single_site()
            .with_user(sample_user(1, "admin", &[]))
            .with_user(sample_user(2, "editor", &[]))
            .with_user(sample_user(3, "author", &[]))
            .with_comment(MAIN_SITE, sample_comment(1, 10, CommentStatus::Published))
            .with_comment(MAIN_SITE, sample_comment(2, 10, CommentStatus::Spam))
            .with_comment(MAIN_SITE, sample_comment(3, 11, CommentStatus::Trashed)),
    )
}

#[fixture]
fn network() -> Arc<InMemoryRecordStore> {
    let site_one = SiteId::new(1);
    let site_two = SiteId::new(2);
    Arc::new(
        InMemoryRecordStore::multisite([site_one, site_two])
            .with_user(sample_user(1, "admin", &[1]))
            .with_user(sample_user(2, "editor", &[1, 2]))
            .with_user(sample_user(3, "author", &[2]))
            .with_comment(site_one, sample_comment(1, 10, CommentStatus::Published))
            .with_comment(site_two, sample_comment(1, 20, CommentStatus::Published))
            .with_comment(site_two, sample_comment(2, 20, CommentStatus::Trashed)),
    )
}

#[rstest]
fn kept_user_is_untouched_and_others_rewritten(blog: Arc<InMemoryRecordStore>) {
    let before = blog.users();
    let run_plan = plan(&*blog, Some("2"), None);

    let result = engine(Arc::clone(&blog)).run(&run_plan).expect("run succeeds");

    let after = blog.users();
    assert_eq!(result.users_updated, 2);
    assert_eq!(after[1], before[1], "kept user must be byte-identical");
    for index in [0, 2] {
        assert_eq!(after[index].id, before[index].id);
        assert_ne!(after[index].login, before[index].login);
        assert_ne!(after[index].email, before[index].email);
        assert_ne!(after[index].password_hash, before[index].password_hash);
    }
}

#[rstest]
fn comments_in_every_status_are_rewritten(blog: Arc<InMemoryRecordStore>) {
    let run_plan = plan(&*blog, None, None);

    let result = engine(Arc::clone(&blog)).run(&run_plan).expect("run succeeds");

    assert_eq!(result.comments_updated, 3);
    assert_eq!(result.comments_skipped, 0);
    for (id, status) in [
        (1, CommentStatus::Published),
        (2, CommentStatus::Spam),
        (3, CommentStatus::Trashed),
    ] {
        let original = sample_comment(id, 10, status);
        let comment = blog
            .comment(MAIN_SITE, CommentId::new(id))
            .expect("comment kept");
        assert_ne!(comment.author, original.author);
        assert_ne!(comment.author_email, original.author_email);
        assert_ne!(comment.author_url, original.author_url);
        assert_ne!(comment.author_ip, original.author_ip);
        assert_ne!(comment.agent, original.agent);
        assert_eq!(comment.status, status);
    }
}

#[rstest]
fn excluding_every_user_updates_none(blog: Arc<InMemoryRecordStore>) {
    let before = blog.users();
    let run_plan = plan(&*blog, Some("1,2,3"), None);

    let result = engine(Arc::clone(&blog)).run(&run_plan).expect("run succeeds");

    assert_eq!(result.users_updated, 0);
    assert_eq!(result.comments_updated, 3);
    assert_eq!(blog.users(), before);
}

#[rstest]
fn users_on_several_sites_are_rewritten_once(network: Arc<InMemoryRecordStore>) {
    let rewrites = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&rewrites);
    let hooks = SanitizerHooks::new().on_post_update_user(move |original, _, _| {
        log.lock().expect("rewrite log").push(original.id.get());
        Ok(())
    });
    let run_plan = plan(&*network, None, None);

    let result = engine(Arc::clone(&network))
        .with_hooks(hooks)
        .run(&run_plan)
        .expect("run succeeds");

    assert_eq!(result.users_updated, 3);
    assert_eq!(*rewrites.lock().expect("rewrite log"), vec![1, 2, 3]);
    assert_eq!(result.comments_updated, 3);
    assert_eq!(network.context_depth(), 0);
}

#[rstest]
fn site_scope_limits_users_and_comments(network: Arc<InMemoryRecordStore>) {
    let run_plan = plan(&*network, None, Some("2"));

    let result = engine(Arc::clone(&network)).run(&run_plan).expect("run succeeds");

    assert_eq!(result.scope, SiteScope::Site(SiteId::new(2)));
    assert_eq!(result.users_updated, 2);
    assert_eq!(result.comments_updated, 2);
    let admin = network.user(UserId::new(1)).expect("admin");
    assert_eq!(admin.login, "admin");
    let other_site = network
        .comment(SiteId::new(1), CommentId::new(1))
        .expect("comment on site 1");
    assert_eq!(other_site.author, "Real Author 1");
    let in_scope = network
        .comment(SiteId::new(2), CommentId::new(1))
        .expect("comment on site 2");
    assert_ne!(in_scope.author, "Real Author 1");
}

#[rstest]
fn vanished_comment_is_skipped_without_post_hook(blog: Arc<InMemoryRecordStore>) {
    let remover = Arc::clone(&blog);
    let post_hook_calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&post_hook_calls);
    let hooks = SanitizerHooks::new()
        .on_pre_update_comment(move |original, _, _| {
            if original.id == CommentId::new(2) {
                remover.remove_comment(MAIN_SITE, original.id);
            }
            Ok(())
        })
        .on_post_update_comment(move |original, _, _| {
            log.lock().expect("hook log").push(original.id.get());
            Ok(())
        });
    let run_plan = plan(&*blog, None, None);

    let result = engine(Arc::clone(&blog))
        .with_hooks(hooks)
        .run(&run_plan)
        .expect("run succeeds");

    assert_eq!(result.comments_updated, 2);
    assert_eq!(result.comments_skipped, 1);
    assert_eq!(*post_hook_calls.lock().expect("hook log"), vec![1, 3]);
}

#[rstest]
fn failing_user_hook_aborts_before_the_write(blog: Arc<InMemoryRecordStore>) {
    let before = blog.users();
    let hooks =
        SanitizerHooks::new().on_pre_update_user(|_, _, _| Err("profile service down".into()));
    let run_plan = plan(&*blog, None, None);

    let err = engine(Arc::clone(&blog))
        .with_hooks(hooks)
        .run(&run_plan)
        .expect_err("hook failure aborts");

    let SanitizeError::Hook(failure) = err else {
        panic!("expected hook failure");
    };
    assert_eq!(failure.point, HookPoint::PreUpdateUser);
    assert_eq!(blog.users(), before);
    let comment = blog
        .comment(MAIN_SITE, CommentId::new(1))
        .expect("comment kept");
    assert_eq!(comment.author, "Real Author 1");
}

#[rstest]
fn earlier_rewrites_remain_after_a_failure(blog: Arc<InMemoryRecordStore>) {
    let hooks = SanitizerHooks::new().on_post_update_user(|original, _, _| {
        if original.id == UserId::new(2) {
            return Err("stop".into());
        }
        Ok(())
    });
    let run_plan = plan(&*blog, None, None);

    let result = engine(Arc::clone(&blog)).with_hooks(hooks).run(&run_plan);

    assert!(matches!(result, Err(SanitizeError::Hook(_))));
    let first = blog.user(UserId::new(1)).expect("user 1");
    let third = blog.user(UserId::new(3)).expect("user 3");
    assert_ne!(first.login, "admin");
    assert_eq!(third.login, "author");
}

#[rstest]
fn partition_is_restored_when_the_comment_pass_fails(network: Arc<InMemoryRecordStore>) {
    let hooks = SanitizerHooks::new()
        .on_pre_update_comment(|_, _, _| Err("comment meta store down".into()));
    let run_plan = plan(&*network, None, None);

    let result = engine(Arc::clone(&network)).with_hooks(hooks).run(&run_plan);

    assert!(matches!(result, Err(SanitizeError::Hook(_))));
    assert_eq!(network.context_depth(), 0);
}

#[rstest]
fn pre_hook_metadata_is_persisted(blog: Arc<InMemoryRecordStore>) {
    let hooks = SanitizerHooks::new()
        .on_pre_update_user(|_, proposed, values| {
            let phone = values.password();
            proposed
                .profile
                .meta
                .insert("billing_phone".to_owned(), phone);
            Ok(())
        })
        .on_pre_update_comment(|_, proposed, _| {
            proposed
                .meta
                .insert("anonymised".to_owned(), "yes".to_owned());
            Ok(())
        });
    let run_plan = plan(&*blog, Some("1,2"), None);

    engine(Arc::clone(&blog))
        .with_hooks(hooks)
        .run(&run_plan)
        .expect("run succeeds");

    let rewritten = blog.user(UserId::new(3)).expect("user 3");
    let kept = blog.user(UserId::new(1)).expect("user 1");
    assert!(rewritten.meta.contains_key("billing_phone"));
    assert!(!kept.meta.contains_key("billing_phone"));
    let comment = blog
        .comment(MAIN_SITE, CommentId::new(3))
        .expect("comment kept");
    assert_eq!(
        comment.meta.get("anonymised").map(String::as_str),
        Some("yes")
    );
}

#[rstest]
fn login_is_written_by_a_separate_update_after_the_profile() {
    let mut seq = Sequence::new();
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store
        .expect_list_users()
        .returning(|_| Ok(vec![sample_user(4, "original", &[])]));
    store.expect_find_user().returning(|_| Ok(None));
    store
        .expect_update_user_primary_fields()
        .withf(|id, update| *id == UserId::new(4) && update.display_name == "Given5")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    store
        .expect_update_user_login()
        .withf(|id, login| *id == UserId::new(4) && login == "synthetic.user6")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    store.expect_list_comments().returning(|_| Ok(Vec::new()));
    let store = Arc::new(store);
    let run_plan = RunPlan {
        scope: SiteScope::SingleSite,
        exclusions: ExclusionSet::new(),
    };

    let result = engine(store).run(&run_plan).expect("run succeeds");

    assert_eq!(result.users_updated, 1);
}

#[rstest]
fn excluded_users_returned_by_the_store_are_still_skipped() {
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store
        .expect_list_users()
        .returning(|_| Ok(vec![sample_user(2, "kept", &[])]));
    store.expect_update_user_primary_fields().never();
    store.expect_update_user_login().never();
    store.expect_list_comments().returning(|_| Ok(Vec::new()));
    let run_plan = RunPlan {
        scope: SiteScope::SingleSite,
        exclusions: [UserId::new(2)].into_iter().collect(),
    };

    let result = engine(Arc::new(store)).run(&run_plan).expect("run succeeds");

    assert_eq!(result.users_updated, 0);
}

#[rstest]
fn comment_listed_under_two_statuses_is_rewritten_once() {
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store.expect_list_users().returning(|_| Ok(Vec::new()));
    store
        .expect_list_comments()
        .times(3)
        .returning(|_| Ok(vec![sample_comment(5, 50, CommentStatus::Published)]));
    store
        .expect_update_comment()
        .withf(|id, _| *id == CommentId::new(5))
        .times(1)
        .returning(|_, _| Ok(()));
    let run_plan = RunPlan {
        scope: SiteScope::SingleSite,
        exclusions: ExclusionSet::new(),
    };

    let result = engine(Arc::new(store)).run(&run_plan).expect("run succeeds");

    assert_eq!(result.comments_updated, 1);
}

#[rstest]
fn comment_store_failures_abort_the_run() {
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store.expect_list_users().returning(|_| Ok(Vec::new()));
    store
        .expect_list_comments()
        .returning(|_| Ok(vec![sample_comment(5, 50, CommentStatus::Spam)]));
    store
        .expect_update_comment()
        .returning(|_, _| Err(RecordStoreError::query("deadlock")));
    let run_plan = RunPlan {
        scope: SiteScope::SingleSite,
        exclusions: ExclusionSet::new(),
    };

    let result = engine(Arc::new(store)).run(&run_plan);

    assert!(matches!(
        result,
        Err(SanitizeError::Store(RecordStoreError::Query { .. }))
    ));
}

#[rstest]
fn login_exhaustion_aborts_the_run() {
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store
        .expect_list_users()
        .returning(|_| Ok(vec![sample_user(1, "admin", &[])]));
    store
        .expect_find_user()
        .returning(|_| Ok(Some(sample_user(9, "taken", &[]))));
    store.expect_update_user_primary_fields().never();
    let run_plan = RunPlan {
        scope: SiteScope::SingleSite,
        exclusions: ExclusionSet::new(),
    };

    let result = engine(Arc::new(store)).run(&run_plan);

    assert!(matches!(
        result,
        Err(SanitizeError::Login(LoginGenerationError::Exhausted { .. }))
    ));
}

#[rstest]
fn progress_reports_each_phase(blog: Arc<InMemoryRecordStore>) {
    let events = Events::default();
    let progress = RecordingProgress {
        events: Arc::clone(&events),
    };
    let run_plan = plan(&*blog, Some("1,3"), None);

    engine(Arc::clone(&blog))
        .with_progress(Box::new(progress))
        .run(&run_plan)
        .expect("run succeeds");

    let expected = [
        "start Rewriting users... 1",
        "tick",
        "finish",
        "start Rewriting comments... 3",
        "tick",
        "tick",
        "tick",
        "finish",
    ];
    assert_eq!(*events.lock().expect("progress log"), expected);
}

#[rstest]
fn site_is_validated_before_users_to_keep() {
    let mut store = MockRecordStore::new();
    store.expect_is_multisite().return_const(false);
    store.expect_find_user().never();

    let result = RunPlan::prepare(
        &store,
        &RunOptions {
            keep: Some("admin".to_owned()),
            policy: NotFoundPolicy::Strict,
            site: Some("9".to_owned()),
        },
    );

    assert_eq!(result, Err(InputError::Scope(ScopeError::NotMultisite)));
}

#[rstest]
fn unresolvable_keep_token_fails_preparation(blog: Arc<InMemoryRecordStore>) {
    let result = RunPlan::prepare(
        &*blog,
        &RunOptions {
            keep: Some("ghost@nowhere.test".to_owned()),
            policy: NotFoundPolicy::Strict,
            site: None,
        },
    );

    assert_eq!(
        result,
        Err(InputError::Exclusion(ExclusionError::EmailNotFound {
            email: "ghost@nowhere.test".to_owned()
        }))
    );
}

#[rstest]
fn lenient_preparation_drops_unknown_tokens(blog: Arc<InMemoryRecordStore>) {
    let run_plan = RunPlan::prepare(
        &*blog,
        &RunOptions {
            keep: Some("ghost@nowhere.test,2".to_owned()),
            policy: NotFoundPolicy::Lenient,
            site: None,
        },
    )
    .expect("lenient plan");

    assert_eq!(run_plan.exclusions.to_string(), "2");
    assert_eq!(run_plan.scope, SiteScope::SingleSite);
}
