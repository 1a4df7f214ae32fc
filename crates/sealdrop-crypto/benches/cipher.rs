use sealdrop_crypto::{decrypt, encrypt, generate_iv, generate_key};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576, 16777216])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let key = generate_key().unwrap();
    let iv = generate_iv().unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt(
                divan::black_box(&data),
                divan::black_box(&key),
                divan::black_box(&iv),
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576, 16777216])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let key = generate_key().unwrap();
    let iv = generate_iv().unwrap();
    let data = make_data(size);
    let sealed = encrypt(&data, &key, &iv).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&sealed),
                divan::black_box(&key),
                divan::black_box(&iv),
            )
            .unwrap()
        });
}

fn main() {
    divan::main();
}
