use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gcms_align::alignment::{general_gaussian, weighted_rolling_mean};
use gcms_align::detection::{DiagnosticTrace, IonWindow, PeakLocator, ProminenceSearch};
use gcms_align::scan::Scan;
use gcms_align::signal::{find_peaks, PeakParams};

const WINDOW: IonWindow = IonWindow {
    min_ion: 324.0,
    max_ion: 325.0,
};

/// Noisy trace with a Gaussian bump every 200 samples
fn synthetic_trace(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let x = ((i % 200) as f64 - 100.0) / 6.0;
            let noise = ((i * 7919) % 97) as f64;
            50.0 + noise + 800.0 * (-0.5 * x * x).exp()
        })
        .collect()
}

fn synthetic_scans(len: usize) -> Vec<Scan> {
    synthetic_trace(len)
        .into_iter()
        .enumerate()
        .map(|(i, signal)| {
            Scan::new(
                i as u32 + 1,
                13.0 + i as f64 * 0.01,
                vec![100.0, 322.5, 324.5, 352.5],
                vec![200.0, 40.0, signal, 15.0],
            )
        })
        .collect()
}

fn bench_find_peaks(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_peaks");
    let params = PeakParams::prominence_and_width(250.0, 3.0);

    for len in [400, 2_000, 10_000] {
        let trace = synthetic_trace(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &trace, |b, trace| {
            b.iter(|| black_box(find_peaks(black_box(trace), &params)));
        });
    }

    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("peak_locator");
    // Start well above the bump prominence so the search steps down
    let search = ProminenceSearch {
        initial: 1200.0,
        floor: 230.0,
        stride: 10.0,
        min_width: 3.0,
    };
    let locator = PeakLocator::new(WINDOW, search, 2.0);

    for len in [400, 2_000] {
        let scans = synthetic_scans(len);
        let trace = DiagnosticTrace::extract(&scans, &WINDOW);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &scans, |b, scans| {
            b.iter(|| black_box(locator.locate(&trace, scans)));
        });
    }

    group.finish();
}

fn bench_rolling_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("baseline_rolling_mean");
    let kernel = general_gaussian(300, 1.0, 100.0);

    for len in [1_000, 5_000] {
        let totals = synthetic_trace(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &totals, |b, totals| {
            b.iter(|| black_box(weighted_rolling_mean(black_box(totals), &kernel)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_peaks, bench_locate, bench_rolling_mean);
criterion_main!(benches);
