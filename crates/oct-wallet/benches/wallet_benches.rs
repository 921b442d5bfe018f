//! Criterion benchmarks for oct-wallet.
//!
//! The two PBKDF2 derivations are deliberately slow; these numbers show how
//! slow on the current machine. The AES and X25519 paths should stay in the
//! microsecond range.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oct_core::{Amount, KeyPair};
use oct_wallet::encryption::{self, Salt, SessionKey, derive_vault_key};
use oct_wallet::keys::keypair_from_mnemonic;
use oct_wallet::mnemonic::parse_mnemonic;
use oct_wallet::private_transfer::{claim_private_transfer, create_private_transfer};
use oct_wallet::vault::{Vault, WalletSource};

const PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

fn bench_kdfs(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf");
    group.sample_size(10);

    let mnemonic = parse_mnemonic(PHRASE).unwrap();
    group.bench_function("mnemonic_to_keypair", |b| {
        b.iter(|| keypair_from_mnemonic(black_box(&mnemonic), ""))
    });

    let salt = Salt::from_bytes([7u8; 16]);
    group.bench_function("derive_vault_key", |b| {
        b.iter(|| derive_vault_key(black_box(b"correct-horse"), black_box(&salt)))
    });
    group.finish();
}

fn bench_vault(c: &mut Criterion) {
    let mut vault = Vault::new();
    for i in 0..5u8 {
        vault
            .add_wallet(&format!("w{i}"), &KeyPair::from_secret_bytes([i + 1; 32]), WalletSource::Generated, 5)
            .unwrap();
    }
    let sk = SessionKey::generate().unwrap();
    let env = encryption::encrypt_vault(&vault, &sk).unwrap();

    c.bench_function("encrypt_vault_5", |b| {
        b.iter(|| encryption::encrypt_vault(black_box(&vault), black_box(&sk)).unwrap())
    });
    c.bench_function("decrypt_vault_5", |b| {
        b.iter(|| encryption::decrypt_vault(black_box(&env), black_box(&sk)).unwrap())
    });
}

fn bench_private_transfer(c: &mut Criterion) {
    let alice = KeyPair::from_secret_bytes([0xA1; 32]);
    let bob = KeyPair::from_secret_bytes([0xB0; 32]);
    let bob_pk = bob.public_key();
    let amount = Amount::from_micro(1_000_000);
    let transfer = create_private_transfer(&alice, &bob_pk, amount).unwrap();

    c.bench_function("create_private_transfer", |b| {
        b.iter(|| create_private_transfer(black_box(&alice), black_box(&bob_pk), amount).unwrap())
    });
    c.bench_function("claim_private_transfer", |b| {
        b.iter(|| claim_private_transfer(black_box(&bob), black_box(&transfer)).unwrap())
    });
}

criterion_group!(benches, bench_kdfs, bench_vault, bench_private_transfer);
criterion_main!(benches);
