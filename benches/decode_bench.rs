//! Decode Benchmarks - Hot-Path Performance Validation
//!
//! Benchmarks frame and event decoding, the work done for every pushed
//! message, plus quote book merging.
//!
//! Run with: cargo bench --bench decode_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use kabu_event_feed::domain::decoder::decode_event;
use kabu_event_feed::domain::event::Event;
use kabu_event_feed::domain::frame::decode_frame;
use kabu_event_feed::domain::quote_book::QuoteBook;

/// FD update for `rows` board rows with a 10-level ladder each.
fn fd_payload(rows: usize) -> Vec<u8> {
    let mut raw = String::from("p_cmd\x02FD\x01p_no\x021\x01p_date\x022024.01.04-09:00:00.000");
    for row in 1..=rows {
        raw.push_str(&format!("\x01p_{row}_DPP\x02{}", 3000 + row));
        raw.push_str(&format!("\x01t_{row}_DPP:T\x0209:00"));
        for level in 1..=10 {
            raw.push_str(&format!("\x01p_{row}_GAP{level}\x02{}", 3000 + level));
            raw.push_str(&format!("\x01p_{row}_GAV{level}\x02{}", 100 * level));
            raw.push_str(&format!("\x01p_{row}_GBP{level}\x02{}", 3000 - level));
            raw.push_str(&format!("\x01p_{row}_GBV{level}\x02{}", 100 * level));
        }
    }
    raw.into_bytes()
}

const EC_PAYLOAD: &[u8] = b"p_cmd\x02EC\x01p_no\x0212\x01p_date\x022024.01.04-09:00:01.000\x01p_ENO\x0242\x01p_ON\x0220240104000001\x01p_IC\x027203\x01p_CRPR\x02850.000000\x01p_CRSR\x0210\x01p_EXPR\x02851\x01p_EXSR\x0210\x01p_EXDT\x02090001\x01p_IN\x02g2eDZ4Nn";

/// Benchmark raw frame splitting.
fn bench_decode_frame(c: &mut Criterion) {
    let payload = fd_payload(10);

    c.bench_function("decode_frame_fd_10_rows", |b| {
        b.iter(|| {
            let _frame = decode_frame(black_box(&payload));
        });
    });
}

/// Benchmark typed event decoding.
fn bench_decode_event(c: &mut Criterion) {
    let payload = fd_payload(10);

    c.bench_function("decode_event_fd_10_rows", |b| {
        b.iter(|| {
            let _event = decode_event(black_box(&payload));
        });
    });

    c.bench_function("decode_event_ec", |b| {
        b.iter(|| {
            let _event = decode_event(black_box(EC_PAYLOAD));
        });
    });
}

/// Benchmark merging FD updates into the quote book.
fn bench_quote_book_apply(c: &mut Criterion) {
    let Ok(Event::Fd(fd)) = decode_event(&fd_payload(50)) else {
        panic!("benchmark payload must decode as FD");
    };
    let mut book = QuoteBook::new();

    c.bench_function("quote_book_apply_50_rows", |b| {
        b.iter(|| {
            let _quotes = book.apply(black_box(&fd));
        });
    });
}

criterion_group!(
    benches,
    bench_decode_frame,
    bench_decode_event,
    bench_quote_book_apply
);
criterion_main!(benches);
