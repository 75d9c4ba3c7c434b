#![allow(dead_code)]

pub mod mock_servers;
pub mod test_context;

pub use mock_servers::MockExternalServices;
pub use test_context::TestContext;

use axum_test::TestResponse;
use serde_json::Value;

pub fn assert_json_ok(response: TestResponse) -> Value {
    assert_eq!(
        response.status_code(),
        200,
        "unexpected status, body: {}",
        response.text()
    );
    response.json::<Value>()
}

pub fn facility_rows() -> Value {
    serde_json::json!([
        {
            "BelgeNo": "B-0001",
            "TesisAdi": "PEARL ISTANBUL HOUSE",
            "Sehir": "İSTANBUL",
            "Ilce": "Fatih",
            "BelgeTuru": "BASİT KONAKLAMA",
            "adres": "Sultanahmet"
        },
        {
            "BelgeNo": "B-0002",
            "TesisAdi": "ALEXIA RESORT & SPA HOTEL",
            "Sehir": "ANTALYA",
            "Ilce": "Side",
            "BelgeTuru": "Turizm İşletmesi Belgesi",
            "adres": ""
        },
        {
            "BelgeNo": "B-0003",
            "TesisAdi": "ADMİRAL OTELİ",
            "Sehir": "IZMIR",
            "Ilce": "Konak",
            "BelgeTuru": "plaj isletmesi",
            "adres": ""
        }
    ])
}
