use criterion::{black_box, criterion_group, criterion_main, Criterion};
use databuffet_client::api::auth::{self, Credentials};

/// Signing runs once per request, including every status poll
fn bench_sign(c: &mut Criterion) {
    c.bench_function("sign", |b| {
        b.iter(|| {
            auth::sign(
                black_box("XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"),
                black_box("YYYYYYYY-YYYY-YYYY-YYYY-YYYYYYYYYYYY"),
                black_box("2024-01-01T00:00:00Z"),
            )
        });
    });
}

fn bench_signed_headers(c: &mut Criterion) {
    let credentials = Credentials::new(
        "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX",
        "YYYYYYYY-YYYY-YYYY-YYYY-YYYYYYYYYYYY",
    );

    c.bench_function("signed_headers_fresh_timestamp", |b| {
        b.iter(|| auth::signed_headers(black_box(&credentials)));
    });
}

criterion_group!(benches, bench_sign, bench_signed_headers);
criterion_main!(benches);
