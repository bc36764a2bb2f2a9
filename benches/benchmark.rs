use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

use stafacade::identity::IdentityStore;
use stafacade::native::SenseBox;
use stafacade::path;
use stafacade::persist::PersistenceMode;
use stafacade::translate::{distinct_sensors, Translator};

fn sample_boxes(n: usize) -> Vec<SenseBox> {
    (0..n)
        .map(|i| {
            serde_json::from_value(json!({
                "_id": format!("box{i}"),
                "name": format!("Box {i}"),
                "model": "homeV2Wifi",
                "currentLocation": { "type": "Point", "coordinates": [7.6, 51.9] },
                "sensors": [
                    { "_id": format!("t{i}"), "title": "Temperatur", "unit": "°C", "sensorType": "HDC1080" },
                    { "_id": format!("p{i}"), "title": "PM2.5", "unit": "µg/m³", "sensorType": if i % 2 == 0 { "SDS 011" } else { "SPS30" } }
                ]
            }))
            .unwrap()
        })
        .collect()
}

fn parse_paths(c: &mut Criterion) {
    c.bench_function("parse nested path", |b| {
        b.iter(|| path::parse(black_box("Things('abc123')"), black_box(Some("Datastreams")), None))
    });
    c.bench_function("parse attribute value path", |b| {
        b.iter(|| path::parse(black_box("Datastreams(42)"), black_box(Some("name")), black_box(Some("$value"))))
    });
}

fn project(c: &mut Criterion) {
    let boxes = sample_boxes(500);
    let store = Arc::new(IdentityStore::open(&PersistenceMode::InMemory).unwrap());
    let translator = Translator::new("http://localhost:8000/v1.1", store);
    c.bench_function("project 500 things", |b| {
        b.iter(|| boxes.iter().map(|x| translator.thing(black_box(x))).count())
    });
    c.bench_function("distinct sensors over 500 boxes", |b| {
        b.iter(|| distinct_sensors(black_box(&boxes)).len())
    });
    c.bench_function("resolve known datastream", |b| {
        translator.datastream(&boxes[0].sensors[0], &boxes[0].id).unwrap();
        b.iter(|| translator.datastream(black_box(&boxes[0].sensors[0]), &boxes[0].id).unwrap())
    });
}

criterion_group!(benches, parse_paths, project);
criterion_main!(benches);
