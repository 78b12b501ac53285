use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use lessonmark_core::{Options, Renderer};
use std::io::{self, Write};

// A dummy writer that discards data, similar to /dev/null
struct NullWriter;
impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn generate_lesson() -> String {
    let mut s = String::with_capacity(200_000);
    s.push_str("# Benchmark Lesson\n\n");
    for i in 0..2_000 {
        s.push_str(&format!(
            "Step {i}: the energy is $$E_{i} = m c^2$$ and the ratio $\\frac{{a}}{{b}}$ holds.\n\n"
        ));
        s.push_str("* Nested item with **bold** text and $x^2$\n\n");
        if i % 100 == 0 {
            s.push_str("```table\nQuantity,Symbol\nMass,$m$\nSpeed of light,$c$\n```\n\n");
        }
    }
    s
}

fn benchmark_pipeline(c: &mut Criterion) {
    let input = generate_lesson();
    let renderer = Renderer::new(Options::default());
    let mut group = c.benchmark_group("pipeline_throughput");

    // Calculate throughput in bytes per second
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("render_tree", |b| {
        b.iter(|| renderer.render(black_box(&input)))
    });

    group.bench_function("streaming_html", |b| {
        b.iter(|| {
            let _ = renderer
                .render_to_writer(black_box(&input), NullWriter)
                .unwrap();
        })
    });

    group.bench_function("buffering_string", |b| {
        b.iter(|| {
            let html = renderer.render_html(black_box(&input)).unwrap();
            let mut writer = NullWriter;
            writer.write_all(html.as_bytes()).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
