use super::*;
use crate::error::ReorderError;
use crate::reorder::DropResult;

fn file(name: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, vec![size as u8; size])
}

fn names(list: &MediaList) -> Vec<String> {
    list.items()
        .iter()
        .map(|item| match &item.source {
            MediaSource::Pending(media) => media.file_name.clone(),
            MediaSource::Existing { path } => path.clone(),
        })
        .collect()
}

#[test]
fn test_add_keeps_input_order() {
    let mut list = MediaList::new(MediaKind::Photo);
    let outcome = list.add(vec![file("a.jpg", 100), file("b.jpg", 200)]);

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.duplicates_skipped, 0);
    assert_eq!(names(&list), vec!["a.jpg", "b.jpg"]);
    assert!(list.items().iter().all(|item| item.origin() == MediaOrigin::Pending));
    assert_eq!(list.previews().live_count(), 2);
}

#[test]
fn test_add_same_file_twice_reports_one_duplicate() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.add(vec![file("a.jpg", 100)]);

    let outcome = list.add(vec![file("a.jpg", 100)]);
    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.duplicates_skipped, 1);
    assert_eq!(list.len(), 1);
}

#[test]
fn test_same_name_different_size_is_not_duplicate() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.add(vec![file("a.jpg", 100)]);

    let outcome = list.add(vec![file("a.jpg", 101)]);
    assert_eq!(outcome.duplicates_skipped, 0);
    assert_eq!(list.len(), 2);
}

#[test]
fn test_duplicates_inside_one_batch_are_skipped() {
    let mut list = MediaList::new(MediaKind::Video);
    let outcome = list.add(vec![file("clip.mp4", 50), file("clip.mp4", 50)]);

    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.duplicates_skipped, 1);
}

#[test]
fn test_batching_does_not_change_result() {
    let files: Vec<IncomingFile> = (1..=6).map(|i| file(&format!("f{}.jpg", i), i * 10)).collect();

    let mut single = MediaList::new(MediaKind::Photo);
    single.add(files.clone());

    let mut batched = MediaList::new(MediaKind::Photo);
    batched.add(files[..2].to_vec());
    batched.add(files[2..3].to_vec());
    batched.add(files[3..].to_vec());

    let mut one_by_one = MediaList::new(MediaKind::Photo);
    for f in &files {
        one_by_one.add(vec![f.clone()]);
    }

    assert_eq!(single.len(), 6);
    assert_eq!(batched.len(), 6);
    assert_eq!(one_by_one.len(), 6);
    assert_eq!(names(&single), names(&batched));
}

#[test]
fn test_existing_items_do_not_count_for_dedupe() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.load_existing(["/uploads/a.jpg"]);

    let outcome = list.add(vec![file("/uploads/a.jpg", 10)]);
    assert_eq!(outcome.duplicates_skipped, 0);
    assert_eq!(list.len(), 2);
}

#[test]
fn test_remove_releases_preview() {
    let mut list = MediaList::new(MediaKind::Photo);
    let outcome = list.add(vec![file("a.jpg", 10), file("b.jpg", 20)]);
    let first = outcome.accepted[0].id;

    assert!(list.remove(first));
    assert_eq!(list.len(), 1);
    assert_eq!(list.previews().live_count(), 1);
    assert!(!list.remove(first));
}

#[test]
fn test_repeated_add_remove_does_not_leak_previews() {
    let mut list = MediaList::new(MediaKind::Photo);

    for round in 0..20 {
        let outcome = list.add(vec![file(&format!("r{}.jpg", round), 64)]);
        list.remove(outcome.accepted[0].id);
    }

    assert!(list.is_empty());
    assert_eq!(list.previews().live_count(), 0);
}

#[test]
fn test_removed_item_may_be_added_again() {
    let mut list = MediaList::new(MediaKind::Photo);
    let outcome = list.add(vec![file("a.jpg", 10)]);
    list.remove(outcome.accepted[0].id);

    let again = list.add(vec![file("a.jpg", 10)]);
    assert_eq!(again.duplicates_skipped, 0);
    assert_eq!(list.len(), 1);
}

#[test]
fn test_reorder_same_index_is_noop() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.add(vec![file("a.jpg", 1), file("b.jpg", 2), file("c.jpg", 3)]);
    let before = list.items().to_vec();

    list.reorder(1, 1).unwrap();
    assert_eq!(list.items(), before.as_slice());
}

#[test]
fn test_reorder_out_of_range_leaves_list_intact() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.add(vec![file("a.jpg", 1), file("b.jpg", 2)]);
    let before = list.items().to_vec();

    assert_eq!(
        list.reorder(0, 2),
        Err(ReorderError::IndexOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(list.items(), before.as_slice());
}

#[test]
fn test_drag_and_arrow_moves() {
    let mut list = MediaList::new(MediaKind::Video);
    list.add(vec![file("a.mp4", 1), file("b.mp4", 2), file("c.mp4", 3)]);

    assert!(!list.apply_drop(DropResult::new(0, None)).unwrap());
    assert!(list.apply_drop(DropResult::new(0, Some(2))).unwrap());
    assert_eq!(names(&list), vec!["b.mp4", "c.mp4", "a.mp4"]);

    assert!(list.move_up(2).unwrap());
    assert_eq!(names(&list), vec!["b.mp4", "a.mp4", "c.mp4"]);
    assert!(!list.move_down(2).unwrap());
    assert!(!list.move_up(0).unwrap());
}

#[test]
fn test_upload_payload_preserves_order_per_origin() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.load_existing(["/uploads/e1.jpg", "/uploads/e2.jpg"]);
    list.add(vec![file("n1.jpg", 5), file("n2.jpg", 6)]);

    // e1, e2, n1, n2 -> n2, e2, n1, e1
    list.reorder(3, 0).unwrap();
    list.reorder(1, 3).unwrap();
    assert_eq!(
        names(&list),
        vec!["n2.jpg", "/uploads/e2.jpg", "n1.jpg", "/uploads/e1.jpg"]
    );

    let payload = list.to_upload_payload();
    let pending: Vec<&str> = payload.pending.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(pending, vec!["n2.jpg", "n1.jpg"]);
    assert_eq!(payload.existing_order, vec!["/uploads/e2.jpg", "/uploads/e1.jpg"]);
    assert_eq!(payload.pending[0].content_type, "image/jpeg");
}

#[test]
fn test_add_move_remove_upload_scenario() {
    let mut list = MediaList::new(MediaKind::Photo);
    let outcome = list.add(vec![file("fileA", 100), file("fileB", 200)]);
    let file_a = outcome.accepted[0].id;
    assert_eq!(list.len(), 2);

    list.reorder(0, 1).unwrap();
    assert_eq!(names(&list), vec!["fileB", "fileA"]);

    list.remove(file_a);
    assert_eq!(names(&list), vec!["fileB"]);

    let payload = list.to_upload_payload();
    assert_eq!(payload.pending.len(), 1);
    assert_eq!(payload.pending[0].data.len(), 200);
    assert!(payload.existing_order.is_empty());
}

#[test]
fn test_into_upload_payload_releases_everything() {
    let registry = PreviewRegistry::new();
    let mut list = MediaList::with_registry(MediaKind::Photo, registry.clone());
    list.add(vec![file("a.jpg", 1), file("b.jpg", 2)]);

    let payload = list.into_upload_payload();
    assert_eq!(payload.pending.len(), 2);
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_dropping_list_releases_previews() {
    let registry = PreviewRegistry::new();
    {
        let mut list = MediaList::with_registry(MediaKind::Video, registry.clone());
        list.add(vec![file("a.mp4", 1)]);
        assert_eq!(registry.live_count(), 1);
    }
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_display_url_by_origin() {
    let mut list = MediaList::new(MediaKind::Photo);
    list.load_existing(["/uploads/x.jpg"]);
    list.add(vec![file("y.jpg", 3)]);

    let existing = &list.items()[0];
    assert_eq!(
        existing.display_url("http://localhost:3001/"),
        "http://localhost:3001/uploads/x.jpg"
    );

    let pending = &list.items()[1];
    let media = pending.pending_media().unwrap();
    assert!(pending.display_url("http://localhost:3001").starts_with("blob:"));
    assert_eq!(list.previews().resolve(&media.preview).unwrap().len(), 3);
}
