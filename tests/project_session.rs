// Integration test: project editing sessions, shared sessions and runs

mod common;

use common::*;
use ringbuf::traits::Consumer;
use std::sync::Arc;
use xtmf_editing::project::{QueuedRuns, StructureProvider};
use xtmf_editing::{
    EditingConfig, MemoryProject, NotificationKind, ProjectEditingSession, ProjectError,
    SessionError,
};

fn project_with(provider: Arc<MemoryProject>, runs: Option<Arc<QueuedRuns>>) -> ProjectEditingSession {
    ProjectEditingSession::new(
        provider,
        registry(),
        EditingConfig::default(),
        runs.map(|r| r as Arc<dyn xtmf_editing::RunController>),
    )
}

#[test]
fn test_last_handle_tears_session_down() {
    let project = project_with(memory_project(&["A"]), None);
    let first = project.edit_model_system(0).unwrap();
    let mut notifications = first.take_notifications().unwrap();
    let second = project.edit_model_system(0).unwrap();
    assert!(first.same_session(&second));

    drop(first);
    assert!(project.is_editing(0));
    assert!(second.will_close_terminate());
    second.close().unwrap();
    assert!(!project.is_editing(0));

    let mut closed = false;
    while let Some(notification) = notifications.try_pop() {
        closed |= notification.kind == NotificationKind::SessionClosed;
    }
    assert!(closed);

    // A new request builds a fresh session
    let third = project.edit_model_system(0).unwrap();
    assert_eq!(third.reference_count(), 1);
}

#[test]
fn test_close_with_unsaved_changes_keeps_reference() {
    let project = project_with(memory_project(&["A"]), None);
    let handle = project.edit_model_system(0).unwrap();
    handle.set_model_system_description("edited").unwrap();

    let (handle, error) = handle.close().unwrap_err();
    assert_eq!(error, SessionError::UnsavedChanges);
    assert_eq!(
        error.to_string(),
        "The project has changed and has not been saved."
    );
    assert!(project.is_editing(0));

    handle.save().unwrap();
    handle.close().unwrap();
    assert!(!project.is_editing(0));
}

#[test]
fn test_remove_refused_while_edited() {
    let provider = memory_project(&["A", "B", "C"]);
    let project = project_with(Arc::clone(&provider), None);
    let handle = project.edit_model_system(2).unwrap();

    assert_eq!(
        project.remove_model_system(2).unwrap_err().to_string(),
        "Unable to remove the model system. It is currently being edited."
    );
    assert_eq!(
        project.remove_model_system(5).unwrap_err().to_string(),
        "The index is invalid."
    );

    let removed = project.remove_model_system(0).unwrap();
    assert_eq!(removed.name, "A");
    assert_eq!(handle.model_system_index(), 1);
    assert_eq!(handle.name(), "C");

    handle.set_model_system_description("saved at new index").unwrap();
    handle.save().unwrap();
    assert_eq!(
        provider.clone_model_system(1).unwrap().description,
        "saved at new index"
    );
}

#[test]
fn test_move_model_system() {
    let project = project_with(memory_project(&["A", "B", "C"]), None);
    let handle = project.edit_model_system(2).unwrap();
    project.move_model_system(2, 0).unwrap();
    assert_eq!(handle.model_system_index(), 0);
    assert_eq!(project.reference_count(0), 1);

    assert_eq!(
        project.move_model_system(3, 0),
        Err(SessionError::Project(ProjectError::MoveSourceOutOfRange))
    );
    assert_eq!(
        project.move_model_system(0, 3).unwrap_err().to_string(),
        "The new position is out of range!"
    );
}

#[test]
fn test_add_model_system() {
    let project = project_with(memory_project(&["A"]), None);
    let index = project.add_model_system(template_snapshot("B")).unwrap();
    assert_eq!(index, 1);
    assert_eq!(project.model_system_count(), 2);
    assert_eq!(project.edit_model_system(1).unwrap().name(), "B");
}

#[test]
fn test_external_save_reloads_live_sessions() {
    let project = project_with(memory_project(&["A"]), None);
    let handle = project.edit_model_system(0).unwrap();
    let mut notifications = handle.take_notifications().unwrap();
    handle.set_model_system_description("local edit").unwrap();
    assert!(handle.can_undo());

    let mut external = template_snapshot("A");
    external.description = "saved elsewhere".to_string();
    let replacement = Arc::new(MemoryProject::with_model_systems("Test Project", vec![external]));
    project.project_was_externally_saved(replacement).unwrap();

    assert!(!handle.can_undo());
    assert!(!handle.can_redo());
    assert!(!handle.is_dirty());
    assert_eq!(
        handle.read(|m| m.description().to_string()),
        "saved elsewhere"
    );
    let mut reloaded = false;
    while let Some(notification) = notifications.try_pop() {
        reloaded |= notification.kind == NotificationKind::Reloaded;
    }
    assert!(reloaded);
}

#[test]
fn test_run_hands_off_live_document() {
    let provider = memory_project(&["A", "B"]);
    let runs = Arc::new(QueuedRuns::new());
    let project = project_with(provider, Some(Arc::clone(&runs)));
    let handle = project.edit_model_system(1).unwrap();
    handle.set_model_system_description("unsaved").unwrap();

    assert_eq!(
        handle.run("bad/name").unwrap_err(),
        SessionError::InvalidRunName("bad/name".to_string())
    );
    let request = handle.run("Base Year").unwrap();
    assert_eq!(request.model_system_index, 1);
    assert_eq!(request.project_name, "Test Project");
    assert_eq!(request.model_systems.len(), 2);
    assert_eq!(request.model_system().unwrap().description, "unsaved");

    let queued = runs.drain();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].run_id, request.run_id);
    assert!(handle.is_dirty());
}

#[test]
fn test_run_without_controller() {
    let project = project_with(memory_project(&["A"]), None);
    let handle = project.edit_model_system(0).unwrap();
    assert_eq!(
        handle.run("Run").unwrap_err().to_string(),
        "You can not run this model system."
    );
}

#[test]
fn test_handles_across_threads() {
    let project = Arc::new(project_with(memory_project(&["A"]), None));
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let project = Arc::clone(&project);
            std::thread::spawn(move || {
                let handle = project.edit_model_system(0).unwrap();
                handle
                    .set_model_system_description(format!("thread {i}"))
                    .unwrap();
                handle.save().unwrap();
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    assert!(!project.is_editing(0));
}
