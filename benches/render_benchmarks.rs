use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wavesync::render::Renderable;
use wavesync::wave::{Dpcm, Envelope, Sign};
use wavesync::{fingerprint, RenderSession, WaveDescriptor};

pub fn criterion_benchmark(c: &mut Criterion) {
    let env = Envelope {
        age: 12,
        life: 600,
        volume: 200,
        envelope: 3,
    };

    let dpcm = WaveDescriptor::Dpcm(Dpcm {
        env,
        data: vec![0x55; 4096].into(),
        freq: 8_000.0,
    })
    .encode();
    c.bench_function("decode dpcm 4k", |b| {
        b.iter(|| WaveDescriptor::decode(black_box(&dpcm)))
    });

    c.bench_function("fingerprint dpcm 4k", |b| b.iter(|| fingerprint(black_box(&dpcm))));

    c.bench_function("SineVoice render 512", |b| {
        let sign = Sign { env, freq: 440.0 };
        let (mut session, _control) = RenderSession::new(sign.voice(), 44_100);
        let mut out = [0.0f32; 512];

        b.iter(|| session.render_into(black_box(&mut out)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
