//! Labelled URLs the bundled backends are fit on when they load.
//!
//! The set is deliberately small: it gives the classifiers a usable decision
//! surface without shipping weights. Label 0 is safe, 1 is malicious.

pub const SAFE: u8 = 0;
pub const MALICIOUS: u8 = 1;

pub const SEED_URLS: &[(&str, u8)] = &[
    ("google.com", SAFE),
    ("facebook.com", SAFE),
    ("amazon.com", SAFE),
    ("https://www.wikipedia.org/wiki/Rust", SAFE),
    ("https://github.com/rust-lang/rust", SAFE),
    ("https://docs.rs/tokio/latest/tokio", SAFE),
    ("https://news.ycombinator.com/news", SAFE),
    ("https://www.bbc.co.uk/news/technology", SAFE),
    ("https://mail.example.org/inbox", SAFE),
    ("https://shop.example.com/cart/checkout", SAFE),
    ("https://www.python.org/downloads", SAFE),
    ("https://stackoverflow.com/questions/tagged/rust", SAFE),
    ("malicious-site.com", MALICIOUS),
    ("phishing-example.com", MALICIOUS),
    ("http://secure-login-paypal.verify-account.ru/signin", MALICIOUS),
    ("http://free-gift-card-winner.xyz/claim-prize", MALICIOUS),
    ("http://update-flash-player.download/setup.exe", MALICIOUS),
    ("http://appleid-locked.confirm-identity.top/unlock", MALICIOUS),
    ("http://malware-drop.biz/payload/trojan.bin", MALICIOUS),
    ("http://bank-verify-account.support/login/secure", MALICIOUS),
    ("http://crypto-double-your-bitcoin.click/giveaway", MALICIOUS),
    ("http://fake-antivirus-scan.win/virus-found", MALICIOUS),
    ("http://hacked-account-recovery.cc/reset-password", MALICIOUS),
    ("http://scam-lottery-winner.icu/claim", MALICIOUS),
];
