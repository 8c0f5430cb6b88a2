//! QA tests for the story catalog.
//!
//! These tests verify the structural guarantees of the bundled stories and
//! that malformed catalogs are rejected when they are loaded.
//! Run with: `cargo test -p storyteller-core --test qa_catalog`

use storyteller_core::{CatalogError, StoryCatalog, Theme, ENTRY_SEGMENT};

#[test]
fn test_builtin_stories_have_no_dangling_choices() {
    let catalog = StoryCatalog::builtin().unwrap();

    for meta in catalog.stories() {
        for segment_id in catalog.reachable_segments(&meta.id) {
            let segment = catalog.get_segment(&meta.id, segment_id).unwrap();
            for choice in &segment.choices {
                assert!(
                    catalog.get_segment(&meta.id, &choice.next_segment_id).is_ok(),
                    "{}: {} -> {} is dangling",
                    meta.id,
                    choice.id,
                    choice.next_segment_id
                );
            }
        }
    }
}

#[test]
fn test_builtin_segments_are_branches_or_endings() {
    let catalog = StoryCatalog::builtin().unwrap();

    for meta in catalog.stories() {
        let story = catalog.story(&meta.id).unwrap();
        for segment in story.segments.values() {
            assert!(
                segment.choices.is_empty() == segment.is_ending,
                "{}: segment {} must have choices xor be an ending",
                meta.id,
                segment.id
            );
        }
    }
}

#[test]
fn test_builtin_segments_all_reachable() {
    let catalog = StoryCatalog::builtin().unwrap();

    for meta in catalog.stories() {
        assert!(
            catalog.unreachable_segments(&meta.id).is_empty(),
            "{} has unreachable segments: {:?}",
            meta.id,
            catalog.unreachable_segments(&meta.id)
        );
    }
}

#[test]
fn test_builtin_listing() {
    let catalog = StoryCatalog::builtin().unwrap();
    let titles: Vec<(&str, Theme)> = catalog
        .stories()
        .map(|meta| (meta.title.as_str(), meta.theme))
        .collect();

    assert_eq!(
        titles,
        [
            ("The Lost Kingdom", Theme::Medieval),
            ("Neon City Conspiracy", Theme::Futuristic),
            ("Ravenwood Mansion", Theme::Horror),
            ("Shadow of the Dragon", Theme::Medieval),
            ("Alpha Dawn", Theme::Futuristic),
            ("The Black Hollow Haunting", Theme::Horror),
        ]
    );
    for meta in catalog.stories() {
        assert!(catalog.get_segment(&meta.id, ENTRY_SEGMENT).is_ok());
    }
}

#[test]
fn test_rejects_dangling_reference_at_load() {
    let json = r#"[{
        "id": "broken",
        "title": "Broken",
        "segments": {
            "start": {
                "id": "start",
                "content": "You wait.",
                "choices": [{"id": "c1", "text": "Go", "nextSegmentId": "nowhere"}]
            }
        }
    }]"#;

    let err = StoryCatalog::from_json(json).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::DanglingChoiceReference { ref target, .. } if target == "nowhere"
    ));
}

#[test]
fn test_rejects_malformed_segment_at_load() {
    let json = r#"[{
        "id": "broken",
        "title": "Broken",
        "segments": {
            "start": {"id": "start", "content": "You wait forever."}
        }
    }]"#;

    let err = StoryCatalog::from_json(json).unwrap_err();
    assert!(matches!(err, CatalogError::MalformedSegment { .. }));
}

#[test]
fn test_rejects_story_without_entry() {
    let json = r#"[{
        "id": "headless",
        "title": "Headless",
        "segments": {
            "middle": {"id": "middle", "content": "Fin.", "isEnding": true}
        }
    }]"#;

    let err = StoryCatalog::from_json(json).unwrap_err();
    assert!(matches!(err, CatalogError::MissingEntry { .. }));
}

#[tokio::test]
async fn test_load_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stories.json");
    std::fs::write(
        &path,
        r#"[{
            "id": "short",
            "title": "Short",
            "theme": "horror",
            "segments": {
                "start": {"id": "start", "content": "It ends.", "isEnding": true, "theme": "horror"}
            }
        }]"#,
    )
    .unwrap();

    let catalog = StoryCatalog::load_json(&path).await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get_segment("short", "start").unwrap().is_terminal());

    let missing = StoryCatalog::load_json(dir.path().join("absent.json")).await;
    assert!(matches!(missing, Err(CatalogError::Io(_))));
}
