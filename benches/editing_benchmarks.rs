use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use xtmf_editing::command::commands::{AddCollectionMemberCommand, SetTypeCommand};
use xtmf_editing::model::{
    MODEL_SYSTEM_TEMPLATE, ModelSystemModel, ModuleRegistry, ParameterKind, ParameterSpec,
    SlotSpec,
};
use xtmf_editing::project::StructureProvider;
use xtmf_editing::{
    EditingConfig, EditingStack, MemoryProject, ModelSystemEditingSession, ModuleType,
    TypeCatalog, UndoableCommand,
};

fn registry() -> Arc<dyn ModuleRegistry> {
    let mut catalog = TypeCatalog::new();
    catalog.register(
        ModuleType::new("Template")
            .implementing(MODEL_SYSTEM_TEMPLATE)
            .with_slot(SlotSpec::collection("Modes", "IMode")),
    );
    catalog.register(
        ModuleType::new("Mode")
            .implementing("IMode")
            .with_parameter(ParameterSpec::new("Constant", ParameterKind::Float, "0.0"))
            .with_parameter(ParameterSpec::new("SomeParam", ParameterKind::Integer, "1")),
    );
    Arc::new(catalog)
}

/// A session whose collection holds `members` modes
fn session_with_members(members: usize) -> ModelSystemEditingSession {
    let registry = registry();
    let mut model = ModelSystemModel::new("Bench", Arc::clone(&registry));
    let root = model.root().id();
    SetTypeCommand::new(root, registry.resolve("Template"))
        .execute(&mut model)
        .unwrap();
    let modes = model.root().children()[0].id();
    let mode = registry.resolve("Mode").unwrap();
    for _ in 0..members {
        AddCollectionMemberCommand::new(modes, Arc::clone(&mode), None)
            .execute(&mut model)
            .unwrap();
    }
    let project = Arc::new(MemoryProject::new("Bench"));
    project.add_model_system(model.to_snapshot()).unwrap();
    ModelSystemEditingSession::open(project, 0, registry, &EditingConfig::default()).unwrap()
}

/// Benchmark the bounded history at and past capacity
fn bench_editing_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("editing_stack");
    for capacity in [16usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let stack = EditingStack::new(capacity);
                b.iter(|| {
                    for i in 0..capacity * 2 {
                        stack.add(black_box(i));
                    }
                    while let Some(item) = stack.pop() {
                        black_box(item);
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark a parameter edit plus its undo and redo
fn bench_parameter_edit(c: &mut Criterion) {
    let session = session_with_members(50);
    let parameter = session.read(|m| {
        let modes = &m.root().children()[0];
        modes.children()[49].parameters().by_name("SomeParam").unwrap().id()
    });

    c.bench_function("set_parameter_undo_redo", |b| {
        b.iter(|| {
            session.set_parameter_value(parameter, black_box("7")).unwrap();
            session.undo().unwrap();
            session.redo().unwrap();
        });
    });
}

/// Benchmark copy and paste of collections of growing size
fn bench_copy_paste(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_paste");
    for members in [1usize, 10, 100] {
        let session = session_with_members(members);
        let modes = session.read(|m| m.root().children()[0].id());
        let buffer = session.copy_module(modes).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(members), &buffer, |b, buffer| {
            b.iter(|| {
                session.paste(modes, black_box(buffer)).unwrap();
                session.undo().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_editing_stack,
    bench_parameter_edit,
    bench_copy_paste
);
criterion_main!(benches);
