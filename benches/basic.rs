use criterion::{black_box, criterion_group, criterion_main, Criterion};
use servo_run::signature::{first_match, BOOT_SIGNATURES, TEST_SIGNATURES};
use servo_run::source::LineAssembler;
use std::time::Duration;

const KERNEL_NOISE: &str =
    "[  512.331204] msm_dpu ae01000.mdp: [drm:dpu_encoder_phys_vid_wait_for_commit_done] vblank timeout";

pub fn bench_signature_matching(c: &mut Criterion) {
    // Nearly every line matches nothing, so the miss path dominates.
    c.bench_function("test_table_miss", |b| {
        b.iter(|| black_box(first_match(&TEST_SIGNATURES, black_box(KERNEL_NOISE))))
    });
    c.bench_function("test_table_harness_hit", |b| {
        b.iter(|| black_box(first_match(&TEST_SIGNATURES, black_box("hwci: mesa: pass"))))
    });
    c.bench_function("boot_table_miss", |b| {
        b.iter(|| black_box(first_match(&BOOT_SIGNATURES, black_box(KERNEL_NOISE))))
    });
}

pub fn bench_line_assembly(c: &mut Criterion) {
    let chunk: Vec<u8> = std::iter::repeat(format!("{}\r\n", KERNEL_NOISE))
        .take(8)
        .collect::<String>()
        .into_bytes();
    c.bench_function("assemble_8_lines", |b| {
        b.iter(|| {
            let mut assembler = LineAssembler::default();
            black_box(assembler.push(black_box(&chunk)))
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_signature_matching, bench_line_assembly
}
criterion_main!(benches);
