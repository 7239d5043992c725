//! Inheritance resolution and meta accumulation across holder graphs.

use warden_core::node::{group_node, meta_node, prefix_node, suffix_node};
use warden_core::{ImmutableContextSet, Node, PermissionsConfig, QueryOptions, Tristate};
use warden_model::{ChatMetaType, DedupeStrategy, NoGroups};
use warden_testkit::TestWorld;

fn contextual(key: &str, value: &str) -> QueryOptions {
    QueryOptions::contextual(ImmutableContextSet::of(key, value))
}

fn global() -> QueryOptions {
    QueryOptions::contextual(ImmutableContextSet::empty())
}

#[test]
fn test_specific_key_outranks_wildcard() {
    let world = TestWorld::new();
    let holder = world.group("g");
    holder.set_permission(Node::builder("foo.*").value(false).build());
    holder.set_permission(Node::builder("foo.bar").build());

    let resolved = holder.resolve_inheritances(&world.groups, &global(), DedupeStrategy::AlmostEqual);
    let keys: Vec<&str> = resolved.iter().map(|n| n.node().key()).collect();
    assert_eq!(keys, vec!["foo.bar", "foo.*"]);
}

#[test]
fn test_cyclic_inheritance_terminates() {
    let world = TestWorld::new();
    let a = world.group("a");
    let b = world.group("b");
    a.set_permission(Node::builder("from.a").build());
    b.set_permission(Node::builder("from.b").build());
    world.inherit(&a, "b");
    world.inherit(&b, "a");

    let resolved = a.resolve_inheritance(&world.groups, &global());
    let mut seen: Vec<(String, String)> = resolved
        .iter()
        .map(|n| (n.location().to_string(), n.node().key().to_string()))
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("a".to_string(), "from.a".to_string()),
            ("a".to_string(), "group.b".to_string()),
            ("b".to_string(), "from.b".to_string()),
            ("b".to_string(), "group.a".to_string()),
        ]
    );

    let user = world.user("Alex");
    world.inherit(&user, "b");
    let locations: Vec<_> = user
        .resolve_inheritance(&world.groups, &global())
        .iter()
        .map(|n| n.location().to_string())
        .collect();
    assert_eq!(locations.iter().filter(|l| *l == "a").count(), 2);
    assert_eq!(locations.iter().filter(|l| *l == "b").count(), 2);
}

#[test]
fn test_context_scoping() {
    let world = TestWorld::new();
    let holder = world.user("Steve");
    holder.set_permission(Node::builder("survival.only").server("survival").build());

    let creative = contextual("server", "creative");
    let survival = contextual("server", "survival");
    assert_eq!(
        holder.check_permission(&world.groups, &creative, "survival.only"),
        Tristate::Undefined
    );
    assert!(holder.all_nodes(&world.groups, &creative).is_empty());
    assert_eq!(
        holder.check_permission(&world.groups, &survival, "survival.only"),
        Tristate::True
    );
}

#[test]
fn test_heavier_group_wins_conflicts() {
    let world = TestWorld::new();
    let vip = world.weighted_group("vip", 5);
    let default = world.weighted_group("default", 1);
    vip.set_permission(Node::builder("a.b").build());
    default.set_permission(Node::builder("a.b").value(false).build());

    let user = world.user("Notch");
    world.inherit(&user, "default");
    world.inherit(&user, "vip");

    assert_eq!(user.check_permission(&world.groups, &global(), "a.b"), Tristate::True);
    let exported = user.export_permissions(&world.groups, &global(), true);
    assert_eq!(exported.get("a.b"), Some(&true));

    let order: Vec<_> = user
        .resolve_inheritance(&world.groups, &global())
        .iter()
        .map(|n| n.location().to_string())
        .collect();
    let first_vip = order.iter().position(|l| l == "vip");
    let first_default = order.iter().position(|l| l == "default");
    assert!(first_vip < first_default);
}

#[test]
fn test_own_node_beats_inherited_node() {
    let world = TestWorld::new();
    let staff = world.group("staff");
    staff.set_permission(Node::builder("kick").build());
    let user = world.user("Alex");
    world.inherit(&user, "staff");
    user.set_permission(Node::builder("kick").value(false).build());

    assert_eq!(user.check_permission(&world.groups, &global(), "kick"), Tristate::False);
    let info = user.inherits_permission_info(&world.groups, &Node::builder("kick").build());
    assert_eq!(info.result(), Tristate::False);
    assert_eq!(info.location(), Some(user.object_name()));
}

#[test]
fn test_server_specific_node_beats_global_node() {
    let world = TestWorld::new();
    let holder = world.group("g");
    holder.set_permission(Node::builder("build").build());
    holder.set_permission(Node::builder("build").server("hub").value(false).build());

    let hub = contextual("server", "hub");
    assert_eq!(holder.check_permission(&NoGroups, &hub, "build"), Tristate::False);
    assert_eq!(holder.check_permission(&NoGroups, &global(), "build"), Tristate::True);
}

#[test]
fn test_inherits_permission_reports_location() {
    let world = TestWorld::new();
    let staff = world.group("staff");
    staff.set_permission(Node::builder("ban").build());
    let user = world.user("Alex");
    world.inherit(&user, "staff");

    let denial = Node::builder("ban").value(false).build();
    let info = user.inherits_permission_info(&world.groups, &denial);
    assert_eq!(info.result(), Tristate::True);
    assert_eq!(info.location(), Some("staff"));
    assert_eq!(
        user.inherits_permission(&world.groups, &Node::builder("unban").build()),
        Tristate::Undefined
    );
}

#[test]
fn test_global_groups_can_be_disabled_by_config() {
    let config = PermissionsConfig {
        apply_global_groups: false,
        ..Default::default()
    };
    let world = TestWorld::with_config(config.clone());
    let staff = world.group("staff");
    let hubstaff = world.group("hubstaff");
    staff.set_permission(Node::builder("global.perm").build());
    hubstaff.set_permission(Node::builder("hub.perm").build());
    let user = world.user("Alex");
    world.inherit(&user, "staff");
    user.set_permission(group_node("hubstaff").server("hub").build());

    let query = config.query_options(ImmutableContextSet::of("server", "hub"));
    let exported = user.export_permissions(&world.groups, &query, false);
    assert_eq!(exported.get("hub.perm"), Some(&true));
    assert!(!exported.contains_key("global.perm"));
}

#[test]
fn test_shorthand_can_be_disabled() {
    let config = PermissionsConfig {
        apply_shorthand: false,
        ..Default::default()
    };
    let world = TestWorld::with_config(config);
    let group = world.group("g");
    group.set_permission(Node::builder("warp.{spawn,shop}").build());

    assert_eq!(
        group.check_permission(&world.groups, &global(), "warp.spawn"),
        Tristate::Undefined
    );
    assert_eq!(
        group.check_permission(&world.groups, &global(), "warp.{spawn,shop}"),
        Tristate::True
    );
}

#[test]
fn test_meta_accumulates_nearest_first() {
    let world = TestWorld::new();
    let admin = world.weighted_group("admin", 50);
    let member = world.weighted_group("member", 10);
    admin.set_permission(prefix_node(50, "[Admin]").build());
    admin.set_permission(meta_node("colour", "red").build());
    member.set_permission(prefix_node(10, "[Member]").build());
    member.set_permission(suffix_node(10, "!").build());
    member.set_permission(meta_node("colour", "grey").build());
    member.set_permission(meta_node("home", "spawn").build());

    let user = world.user("Alex");
    world.inherit(&user, "member");
    world.inherit(&user, "admin");
    user.set_permission(meta_node("home", "base").build());
    user.set_permission(prefix_node(99, "[Off]").value(false).build());

    let meta = user.accumulate_meta(&world.groups, &global());
    assert_eq!(meta.prefix(), Some("[Admin]"));
    assert_eq!(meta.suffix(), Some("!"));
    assert_eq!(meta.meta_value("colour"), Some("red"));
    assert_eq!(meta.meta_values("colour"), ["red", "grey"]);
    assert_eq!(meta.meta_value("home"), Some("base"));
    assert_eq!(meta.weight(), 50);
    assert_eq!(meta.meta_value("weight"), Some("50"));
    assert_eq!(meta.primary_group(), Some("admin"));
    assert_eq!(meta.meta_value("primarygroup"), Some("admin"));
}

#[test]
fn test_meta_respects_include_global() {
    let world = TestWorld::new();
    let group = world.group("g");
    group.set_permission(prefix_node(1, "[Global]").build());
    group.set_permission(prefix_node(2, "[Hub]").server("hub").build());

    let query = QueryOptions::builder()
        .contexts(ImmutableContextSet::of("server", "hub"))
        .include_global(false)
        .build();
    let meta = group.accumulate_meta(&world.groups, &query);
    assert_eq!(meta.prefixes().collect::<Vec<_>>(), vec![(2, "[Hub]")]);
    assert_eq!(meta.primary_group(), None);
}

#[test]
fn test_chat_meta_priority_suggestion() {
    let world = TestWorld::new();
    let vip = world.weighted_group("vip", 20);
    let user = world.user("Alex");
    world.inherit(&user, "vip");
    vip.set_permission(prefix_node(30, "[VIP]").build());

    let query = global();
    assert_eq!(user.suggest_chat_meta_priority(&world.groups, &query, ChatMetaType::Prefix), 31);
    assert_eq!(user.suggest_chat_meta_priority(&world.groups, &query, ChatMetaType::Suffix), 1);
    assert_eq!(vip.suggest_chat_meta_priority(&world.groups, &query, ChatMetaType::Suffix), 20);
    assert_eq!(vip.suggest_chat_meta_priority(&world.groups, &query, ChatMetaType::Prefix), 31);
}

#[test]
fn test_unloaded_group_is_skipped() {
    let world = TestWorld::new();
    let staff = world.group("staff");
    staff.set_permission(Node::builder("kick").build());
    let user = world.user("Alex");
    world.inherit(&user, "staff");
    assert_eq!(user.check_permission(&world.groups, &global(), "kick"), Tristate::True);

    world.groups.unload("staff");
    assert_eq!(user.check_permission(&world.groups, &global(), "kick"), Tristate::Undefined);
}

#[test]
fn test_dedupe_strategies() {
    let world = TestWorld::new();
    let group = world.group("g");
    let now = world.now();
    group.set_permission(Node::builder("x").build());
    group.set_permission(Node::builder("x").expiry(now + 60).build());

    let almost = group.resolve_inheritances(&world.groups, &global(), DedupeStrategy::AlmostEqual);
    assert_eq!(almost.len(), 2);
    let loose = group.resolve_inheritances(
        &world.groups,
        &global(),
        DedupeStrategy::IgnoreValueOrTemporary,
    );
    assert_eq!(loose.len(), 1);
    assert!(loose[0].node().is_permanent());
}
