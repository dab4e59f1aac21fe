// Run with:  cargo bench --bench scan_frame

use argb_matrix::{compute_buffer_bytes, compute_cols, Argb, Matrix, MatrixHardware, ScanConfig, ROWS};
use core::convert::Infallible;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

const COLS: usize = compute_cols(3);
const BYTES: usize = compute_buffer_bytes(COLS);

/// Pins that go nowhere and delays that return at once, so the bench
/// measures the encoding work alone.
struct NullHardware {
    toggles: u32,
}

impl MatrixHardware for NullHardware {
    type Error = Infallible;

    fn set_data(&mut self, high: bool) -> Result<(), Self::Error> {
        black_box(high);
        Ok(())
    }

    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error> {
        self.toggles = self.toggles.wrapping_add(u32::from(high));
        Ok(())
    }

    fn select_row(&mut self, row: u8) -> Result<(), Self::Error> {
        black_box(row);
        Ok(())
    }

    fn set_display_enabled(&mut self, _enabled: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_heartbeat(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_sample(&mut self) -> u8 {
        0
    }

    fn start_sample(&mut self) {}

    fn delay_us(&mut self, _us: u32) {}
}

fn scan_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_frame");
    group.throughput(Throughput::Bytes(BYTES as u64));

    let matrix = Matrix::<COLS, BYTES>::new();
    let mut display = matrix.display();
    display.fill(Argb::rgb(0x5A, 0xA5, 0xFF));

    let mut scan = matrix.scan_driver(NullHardware { toggles: 0 }, ScanConfig::default());
    scan.init().unwrap();

    group.bench_function("full_frame", |b| {
        b.iter(|| {
            for _ in 0..ROWS {
                black_box(&mut scan).tick().unwrap();
            }
        });
    });

    group.bench_function("single_row", |b| {
        b.iter(|| black_box(&mut scan).tick().unwrap());
    });

    group.finish();
    black_box(scan.release().toggles);
}

criterion_group!(benches, scan_frame);
criterion_main!(benches);
