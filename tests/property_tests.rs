//! Property-based tests for reference parsing and link resolution.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use tokio_util::sync::CancellationToken;

use lnsync::core::link::{combine, Link, Links};
use lnsync::core::reference::parse_str;
use lnsync::core::types::{BranchName, FileRef, RepoRef};
use lnsync::engine::{SyncSettings, Synchronizer};
use lnsync::forge::mock::{MockForge, MockOperation};
use lnsync::ui::template::Formatter;

/// Strategy for owner and repository names.
fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,12}"
}

/// Strategy for file paths. Components are kept short so that no path
/// spells a `/blob/` URL.
fn file_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_-]{1,3}(\\.[a-z]{1,3})?", 1..5).prop_map(|parts| parts.join("/"))
}

/// Strategy for git refs.
fn git_ref() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9._-]{0,10}"
}

fn file_ref() -> impl Strategy<Value = FileRef> {
    (segment(), segment(), file_path(), prop::option::of(git_ref())).prop_map(
        |(owner, name, path, git_ref)| {
            let file = FileRef::new(RepoRef::new(owner, name), path);
            match git_ref {
                Some(r) => file.with_ref(r),
                None => file,
            }
        },
    )
}

proptest! {
    /// The canonical form `owner/repo:path@ref` parses back to its parts.
    #[test]
    fn canonical_form_roundtrip(file in file_ref()) {
        let parsed = parse_str(&file.to_string()).unwrap();
        prop_assert_eq!(&parsed.repo, &file.repo);
        prop_assert_eq!(&parsed.path, &file.path);
        prop_assert_eq!(&parsed.git_ref, &file.git_ref);
    }

    /// The short blob form carries the same parts as the canonical form.
    #[test]
    fn short_blob_matches_canonical(
        owner in segment(),
        name in segment(),
        path in file_path(),
        r in git_ref(),
    ) {
        let blob = parse_str(&format!("{owner}/{name}/blob/{r}/{path}")).unwrap();
        let canonical = parse_str(&format!("{owner}/{name}:{path}@{r}")).unwrap();
        prop_assert_eq!(&blob.repo, &canonical.repo);
        prop_assert_eq!(&blob.path, &canonical.path);
        prop_assert_eq!(&blob.git_ref, &canonical.git_ref);
    }

    /// A bare path is kept whole and names no repository.
    #[test]
    fn bare_path_has_no_repo(path in file_path()) {
        let parsed = parse_str(&path).unwrap();
        prop_assert!(parsed.repo.is_empty());
        prop_assert_eq!(parsed.path, path);
    }

    /// Every non-empty single-line string parses to something.
    #[test]
    fn single_line_strings_always_parse(s in "[^\r\n]{1,60}") {
        prop_assert!(parse_str(&s).is_ok());
    }

    /// Combination is the full product, or one edge per source without targets.
    #[test]
    fn combine_cardinality(
        froms in prop::collection::vec(file_ref(), 0..4),
        tos in prop::collection::vec(file_ref(), 0..4),
    ) {
        let expected = match (froms.len(), tos.len()) {
            (0, _) => 0,
            (f, 0) => f,
            (f, t) => f * t,
        };
        prop_assert_eq!(combine(froms, tos).len(), expected);
    }

    /// Grouping partitions the edges by destination repository.
    #[test]
    fn groups_partition_links(
        froms in prop::collection::vec(file_ref(), 1..4),
        tos in prop::collection::vec(file_ref(), 1..4),
    ) {
        let links: Links = combine(froms, tos).into_iter().collect();
        let total = links.len();
        let groups = links.groups();

        let mut seen = 0;
        for (key, group) in groups.iter() {
            prop_assert_eq!(key, &group.repo.to_string());
            for link in &group.links {
                prop_assert_eq!(&link.to.repo, &group.repo);
            }
            seen += group.links.len();
        }
        prop_assert_eq!(seen, total);
    }

    /// Branch names survive serde.
    #[test]
    fn branch_name_serde_roundtrip(name in "[a-z][a-z0-9-]{0,20}(/[a-z][a-z0-9-]{0,20})?") {
        let branch = BranchName::new(&name).unwrap();
        let json = serde_json::to_string(&branch).unwrap();
        let parsed: BranchName = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(branch, parsed);
    }

    /// Whatever the starting contents, a second run writes nothing.
    #[test]
    fn second_run_never_writes(
        source in "[a-z \n]{0,40}",
        target in prop::option::of("[a-z \n]{0,40}"),
    ) {
        let src = RepoRef::new("o", "src");
        let dst = RepoRef::new("o", "dst");
        let mut forge = MockForge::new()
            .with_file(&src, "a.txt", &source)
            .with_repo(&dst, "main");
        if let Some(target) = &target {
            forge = forge.with_file(&dst, "a.txt", target);
        }

        let formatter = Formatter::default();
        let run = |forge: &MockForge| {
            let links: Links = vec![Link::new(
                FileRef::new(src.clone(), "a.txt"),
                FileRef::new(dst.clone(), "a.txt"),
            )]
            .into_iter()
            .collect();
            tokio_test::block_on(
                Synchronizer::new(forge, &formatter, SyncSettings::default())
                    .run(links.groups(), &CancellationToken::new()),
            )
            .unwrap()
        };

        prop_assert!(run(&forge).is_success());
        forge.clear_operations();
        prop_assert!(run(&forge).is_success());

        let writes = forge
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::UpdateFile { .. }))
            .count();
        prop_assert_eq!(writes, 0);
    }
}
