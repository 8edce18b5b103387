use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use json_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, InMemoryTable,
    JsonFileCheckpointSaver, JsonSerializer,
};
use serde_json::json;
use tempfile::TempDir;

fn thread() -> CheckpointConfig {
    CheckpointConfig::new().with_thread_id("bench-thread".to_string())
}

/// Saver over a file already holding `history` checkpoints
async fn seeded_file_saver(dir: &TempDir, history: usize) -> JsonFileCheckpointSaver {
    let saver = JsonFileCheckpointSaver::new(dir.path().join("checkpoint.json"))
        .await
        .unwrap();
    for step in 0..history {
        let checkpoint = Checkpoint::empty().with_value("count", json!(step));
        saver
            .put(&thread(), checkpoint, CheckpointMetadata::new().with_step(step as i32))
            .await
            .unwrap();
    }
    saver
}

fn checkpoint_save_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint save (memory)", |b| {
        let saver = JsonFileCheckpointSaver::with_table(InMemoryTable::new(), JsonSerializer::new());
        b.to_async(&runtime).iter(|| async {
            let checkpoint = Checkpoint::empty().with_value("count", json!(1));
            saver
                .put(&thread(), black_box(checkpoint), black_box(CheckpointMetadata::new()))
                .await
                .unwrap();
        });
    });

    let dir = TempDir::new().unwrap();
    let saver = runtime.block_on(seeded_file_saver(&dir, 100));
    let saver = &saver;
    c.bench_function("checkpoint save (file, 100 history)", |b| {
        b.to_async(&runtime).iter_batched(
            || Checkpoint::empty().with_value("count", json!(1)),
            |checkpoint| async move {
                saver
                    .put(&thread(), black_box(checkpoint), CheckpointMetadata::new())
                    .await
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn checkpoint_load_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let saver = runtime.block_on(seeded_file_saver(&dir, 100));

    c.bench_function("checkpoint load latest (file, 100 history)", |b| {
        b.to_async(&runtime).iter(|| async {
            saver.get_tuple(black_box(&thread())).await.unwrap();
        });
    });
}

criterion_group!(benches, checkpoint_save_benchmark, checkpoint_load_benchmark);
criterion_main!(benches);
