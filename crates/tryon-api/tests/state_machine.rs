//! Transition-table conformance for the session state machine.

mod helpers;

use std::sync::Arc;

use helpers::{both_photos, png_upload, service_at, uploaded_session, ScriptedBackend};
use tempfile::tempdir;
use tryon_api::{Action, ActionInput};
use tryon_core::models::session::{Session, Stage};

#[tokio::test]
async fn test_upload_both_photos_reaches_uploaded() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let session = Session::new();
    let after = service.apply(&session, Action::Upload, both_photos(30, 20)).await;

    assert_eq!(after.stage, Stage::Uploaded);
    let user_ref = after.user_photo.as_deref().unwrap();
    let jewelry_ref = after.jewelry_photo.as_deref().unwrap();
    assert!(user_ref.starts_with("user_"));
    assert!(jewelry_ref.starts_with("jewel_"));
    assert!(after.result_photo.is_none());
    assert!(after.last_error.is_none());

    // Both stored photos exist under the root.
    assert!(dir.path().join(user_ref).is_file());
    assert!(dir.path().join(jewelry_ref).is_file());
}

#[tokio::test]
async fn test_upload_generates_thumbnails() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let after = service
        .apply(&Session::new(), Action::Upload, both_photos(300, 200))
        .await;

    let user_ref = after.user_photo.as_deref().unwrap();
    let thumb = dir.path().join("thumbnails").join(format!("thumb_{user_ref}"));
    assert!(thumb.is_file());

    let img = image::load_from_memory(&std::fs::read(thumb).unwrap()).unwrap();
    assert!(img.width() <= 50 && img.height() <= 50);
}

#[tokio::test]
async fn test_upload_resizes_oversized_photo_in_place() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    // 300x200 exceeds the test bound of 100x100.
    let after = service
        .apply(&Session::new(), Action::Upload, both_photos(300, 200))
        .await;

    let user_ref = after.user_photo.as_deref().unwrap();
    let stored = image::load_from_memory(&std::fs::read(dir.path().join(user_ref)).unwrap()).unwrap();
    assert!(stored.width() <= 100 && stored.height() <= 100);
}

#[tokio::test]
async fn test_upload_missing_jewelry_photo_fails_to_form() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let input = ActionInput {
        user_photo: Some(png_upload("me.png", 20, 20)),
        ..Default::default()
    };
    let after = service.apply(&Session::new(), Action::Upload, input).await;

    assert_eq!(after.stage, Stage::Form);
    let error = after.last_error.unwrap();
    assert!(error.contains("jewelry"), "unexpected message: {error}");
    assert!(after.user_photo.is_none());
}

#[tokio::test]
async fn test_upload_rejects_non_image_payload() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let input = ActionInput {
        user_photo: Some(tryon_api::UploadedFile {
            file_name: "photo.jpg".to_string(),
            bytes: b"definitely not an image".to_vec(),
        }),
        jewelry_photo: Some(png_upload("bracelet.png", 20, 20)),
        ..Default::default()
    };
    let after = service.apply(&Session::new(), Action::Upload, input).await;

    assert_eq!(after.stage, Stage::Form);
    assert!(after.last_error.is_some());
    assert!(after.user_photo.is_none());
    assert!(after.jewelry_photo.is_none());
}

#[tokio::test]
async fn test_upload_from_processed_leaves_stage_unchanged() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let mut session = uploaded_session("user_a.png", "jewel_b.png");
    session.stage = Stage::Processed;
    session.result_photo = Some("user_a-jewel_b.png".to_string());

    let after = service.apply(&session, Action::Upload, both_photos(20, 20)).await;

    // A wrong-stage action is not a failure: nothing moves, only the
    // message is set.
    assert_eq!(after.stage, Stage::Processed);
    assert!(after.last_error.is_some());
    assert_eq!(after.user_photo.as_deref(), Some("user_a.png"));
    assert_eq!(after.jewelry_photo.as_deref(), Some("jewel_b.png"));
    assert_eq!(after.result_photo.as_deref(), Some("user_a-jewel_b.png"));
}

#[tokio::test]
async fn test_tryon_from_processed_leaves_stage_unchanged() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let mut session = uploaded_session("user_a.png", "jewel_b.png");
    session.stage = Stage::Processed;
    session.result_photo = Some("user_a-jewel_b.png".to_string());

    let after = service.apply(&session, Action::Tryon, ActionInput::default()).await;

    assert_eq!(after.stage, Stage::Processed);
    assert!(after.last_error.is_some());
    assert_eq!(after.result_photo.as_deref(), Some("user_a-jewel_b.png"));
}

#[tokio::test]
async fn test_tryon_from_form_is_rejected_in_place() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let after = service
        .apply(&Session::new(), Action::Tryon, ActionInput::default())
        .await;

    assert_eq!(after.stage, Stage::Form);
    assert!(after.last_error.is_some());
}

#[tokio::test]
async fn test_reset_clears_unpinned_refs_from_any_stage() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    for stage in [Stage::Form, Stage::Uploaded, Stage::Processed] {
        let mut session = uploaded_session("user_a.png", "jewel_b.png");
        session.stage = stage;
        session.result_photo = Some("user_a-jewel_b.png".to_string());
        session.last_error = Some("old error".to_string());

        let after = service.apply(&session, Action::Reset, ActionInput::default()).await;

        assert_eq!(after.stage, Stage::Form);
        assert!(after.user_photo.is_none());
        assert!(after.jewelry_photo.is_none());
        assert!(after.result_photo.is_none());
        assert!(after.last_error.is_none());
    }
}

#[tokio::test]
async fn test_reset_keeps_pinned_refs_but_never_the_result() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let mut session = uploaded_session("user_a.png", "jewel_b.png");
    session.stage = Stage::Processed;
    session.result_photo = Some("user_a-jewel_b.png".to_string());
    session.pin_user = true;

    let after = service.apply(&session, Action::Reset, ActionInput::default()).await;

    assert_eq!(after.stage, Stage::Form);
    assert_eq!(after.user_photo.as_deref(), Some("user_a.png"));
    assert!(after.jewelry_photo.is_none());
    assert!(after.result_photo.is_none());
}

#[tokio::test]
async fn test_pin_flags_on_the_request_apply_before_reset() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let session = uploaded_session("user_a.png", "jewel_b.png");
    let input = ActionInput {
        pin_jewelry: Some(true),
        ..Default::default()
    };
    let after = service.apply(&session, Action::Reset, input).await;

    assert!(after.user_photo.is_none());
    assert_eq!(after.jewelry_photo.as_deref(), Some("jewel_b.png"));
    assert!(after.pin_jewelry);
}

#[tokio::test]
async fn test_upload_reuses_existing_ref_for_missing_role() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), Arc::new(ScriptedBackend::succeeding(vec![1]))).await;

    // First upload stores both photos.
    let first = service.apply(&Session::new(), Action::Upload, both_photos(20, 20)).await;
    let jewelry_ref = first.jewelry_photo.clone().unwrap();

    // Second upload brings only a user photo; the session still holds the
    // jewelry ref, which is reused.
    let input = ActionInput {
        user_photo: Some(png_upload("me2.png", 20, 20)),
        ..Default::default()
    };
    let after = service.apply(&first, Action::Upload, input).await;

    assert_eq!(after.stage, Stage::Uploaded);
    assert_eq!(after.jewelry_photo.as_deref(), Some(jewelry_ref.as_str()));
    assert_ne!(after.user_photo, first.user_photo);
}

#[tokio::test]
async fn test_gallery_selection_resolves_stored_photo() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let first = service.apply(&Session::new(), Action::Upload, both_photos(20, 20)).await;
    let user_ref = first.user_photo.clone().unwrap();

    // A new session selects the previously stored user photo from the
    // gallery and uploads a fresh jewelry photo.
    let input = ActionInput {
        user_gallery: Some(user_ref.clone()),
        jewelry_photo: Some(png_upload("ring.png", 20, 20)),
        ..Default::default()
    };
    let after = service.apply(&Session::new(), Action::Upload, input).await;

    assert_eq!(after.stage, Stage::Uploaded);
    assert_eq!(after.user_photo.as_deref(), Some(user_ref.as_str()));
}

#[tokio::test]
async fn test_gallery_selection_with_traversal_fails_safely() {
    let dir = tempdir().unwrap();
    let service = service_at(dir.path(), helpers::always_failing()).await;

    let input = ActionInput {
        user_gallery: Some("../../etc/passwd".to_string()),
        jewelry_photo: Some(png_upload("ring.png", 20, 20)),
        ..Default::default()
    };
    let after = service.apply(&Session::new(), Action::Upload, input).await;

    assert_eq!(after.stage, Stage::Form);
    let error = after.last_error.unwrap();
    assert!(!error.contains("passwd"));
}
