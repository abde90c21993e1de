use std::collections::HashSet;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use mailpreview::model::attachment::AttachmentRecord;
use mailpreview::provider::memory::MemoryResolver;
use mailpreview::{DecodeRequest, ImageAttachmentRequest};

fn resolver() -> Arc<MemoryResolver> {
    let mut r = MemoryResolver::new();
    for i in 0..100 {
        r.insert(
            format!("content://mail/att/{i}"),
            AttachmentRecord::new(Some("image/jpeg"))
                .with_rendition(0, format!("mem/{i}-0"))
                .with_rendition(1, format!("mem/{i}-1")),
        );
    }
    Arc::new(r)
}

#[allow(clippy::mutable_key_type)]
fn bench_dedupe(c: &mut Criterion) {
    let resolver = resolver();

    c.bench_function("dedupe_requests", |b| {
        b.iter(|| {
            let mut seen = HashSet::new();
            for i in 0..1000u32 {
                let req = ImageAttachmentRequest::new(
                    resolver.clone(),
                    format!("content://mail/att/{}", i % 100),
                    (i % 2) as i32,
                    320,
                );
                seen.insert(req);
            }
            seen.len()
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = resolver();

    c.bench_function("resolve_orientation", |b| {
        b.iter(|| {
            let req = ImageAttachmentRequest::new(resolver.clone(), "content://mail/att/7", 1, 320);
            req.has_orientation_exif().unwrap()
        })
    });
}

criterion_group!(benches, bench_dedupe, bench_resolve);
criterion_main!(benches);
