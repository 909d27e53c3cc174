//! Benchmarks for extraction and superimposition.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use supergraph_core::parser::parse_source;
use supergraph_core::{build_project_graph, superimpose, IngestOptions};
use tempfile::TempDir;

const SERVICE: &str = r#"
package com.shop.service;

import com.shop.model.Order;
import com.shop.model.Customer;
import java.util.List;
import java.util.Map;

public class OrderService extends BaseService implements Auditable {
    private final Map<String, Order> orders;
    private Customer owner;
    protected static int counter = 0;

    public OrderService(Map<String, Order> orders) {
        this.orders = orders;
    }

    public Order find(String id) {
        return orders.get(id);
    }

    public List<Order> findAll(int limit, String... tags) {
        counter++;
        return orders.values().stream().limit(limit).toList();
    }

    @Override
    public void audit() {
        System.out.println("audit " + counter);
    }

    static class Cache {
        private long hits;
        long hits() { return hits; }
    }
}
"#;

fn generate_project(files: usize, variant: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("com/shop/model");
    fs::create_dir_all(&pkg).unwrap();
    for i in 0..files {
        let body = format!(
            "package com.shop.model;\n\nimport com.shop.model.Order;\n\npublic class Model{i} {{\n    private Order order;\n    private int value{i};\n\n    public int compute(int x) {{\n        return x * {i} + {variant};\n    }}\n}}\n",
        );
        fs::write(pkg.join(format!("Model{}.java", i)), body).unwrap();
    }
    fs::write(pkg.join("Order.java"), "package com.shop.model;\npublic class Order {}\n").unwrap();
    dir
}

fn bench_parse_single_file(c: &mut Criterion) {
    c.bench_function("parse_java_file", |b| {
        b.iter(|| black_box(parse_source(black_box(SERVICE), "OrderService.java")))
    });
}

fn bench_extract_project(c: &mut Criterion) {
    let project = generate_project(200, "1");
    let options = IngestOptions::new("bench", "left");

    c.bench_function("extract_200_files", |b| {
        b.iter(|| black_box(build_project_graph(project.path(), &options).unwrap()))
    });
}

fn bench_superimpose(c: &mut Criterion) {
    let left_dir = generate_project(200, "1");
    let right_dir = generate_project(200, "2");
    let left = build_project_graph(left_dir.path(), &IngestOptions::new("bench", "left")).unwrap();
    let right =
        build_project_graph(right_dir.path(), &IngestOptions::new("bench", "right")).unwrap();

    c.bench_function("superimpose_200_files", |b| {
        b.iter(|| black_box(superimpose(&left, &right, "bench", None)))
    });
}

criterion_group!(
    benches,
    bench_parse_single_file,
    bench_extract_project,
    bench_superimpose
);
criterion_main!(benches);
