//! Benchmarks for response document parsing

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use s3_cdn::mocks::TestFixtures;
use s3_cdn::xml;

fn bench_listing_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing_page");

    for count in [10usize, 100, 1000].iter() {
        let keys = TestFixtures::object_keys(0..*count);
        let document = TestFixtures::listing_page_xml(&keys, &[], true, None);
        group.throughput(Throughput::Bytes(document.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &document, |b, document| {
            b.iter(|| {
                let root = xml::parse(document.as_bytes()).unwrap();
                xml::parse_listing_page(&root).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_documents(c: &mut Criterion) {
    let acl = TestFixtures::access_control_policy_xml();
    c.bench_function("access_control_policy", |b| {
        b.iter(|| {
            let root = xml::parse(acl.as_bytes()).unwrap();
            xml::parse_access_control_policy(&root).unwrap()
        })
    });

    let error = TestFixtures::error_xml("NoSuchKey", "The specified key does not exist.");
    c.bench_function("error_document", |b| {
        b.iter(|| {
            let root = xml::parse(error.as_bytes()).unwrap();
            xml::parse_error_document(&root)
        })
    });

    let distributions = TestFixtures::distribution_list_xml(&["A1", "B2", "C3", "D4"]);
    c.bench_function("distribution_list", |b| {
        b.iter(|| {
            let root = xml::parse(distributions.as_bytes()).unwrap();
            xml::parse_distribution_list(&root).unwrap()
        })
    });
}

criterion_group!(benches, bench_listing_page, bench_documents);
criterion_main!(benches);
