use serde::Deserialize;

/// Deserialize Binance numbers that may arrive either as strings or as JSON numbers.
pub fn string_or_number_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let n = match v {
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("invalid number"))?,
        _ => return Err(serde::de::Error::custom("invalid numeric value")),
    };
    if !n.is_finite() {
        return Err(serde::de::Error::custom("non-finite numeric value"));
    }
    Ok(n)
}

fn string_or_number_to_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    string_or_number_to_f64(deserializer).map(Some)
}

/// The part of a kline event needed to decide whether it is worth parsing.
///
/// Matches both the combined-stream `data` object and a bare event.
#[derive(Debug, Default, Deserialize)]
pub struct KlineEventHeader {
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,
    #[serde(rename = "k", default)]
    pub kline: Option<KlineFlags>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KlineFlags {
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,
    #[serde(rename = "x", default)]
    pub is_final: bool,
}

/// Binance kline payload (`k` object of a `<symbol>@kline_<interval>` event).
#[derive(Debug, Deserialize)]
pub struct BinanceKline {
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "o", default, deserialize_with = "string_or_number_to_f64_opt")]
    pub open: Option<f64>,
    #[serde(rename = "c", deserialize_with = "string_or_number_to_f64")]
    pub close: f64,
    #[serde(rename = "h", deserialize_with = "string_or_number_to_f64")]
    pub high: f64,
    #[serde(rename = "l", deserialize_with = "string_or_number_to_f64")]
    pub low: f64,
    #[serde(rename = "x")]
    pub is_final: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kline_with_string_prices() {
        let json = r#"{"t":1700000000000,"T":1700000059999,"s":"BTCUSDT","i":"1m","o":"100.5","c":"101.25","h":"102","l":"99.75","x":true}"#;
        let k: BinanceKline = serde_json::from_str(json).unwrap();
        assert_eq!(k.close_time, 1_700_000_059_999);
        assert_eq!(k.open, Some(100.5));
        assert!((k.close - 101.25).abs() < f64::EPSILON);
        assert!((k.high - 102.0).abs() < f64::EPSILON);
        assert!((k.low - 99.75).abs() < f64::EPSILON);
        assert!(k.is_final);
    }

    #[test]
    fn parse_kline_with_numeric_prices() {
        let json = r#"{"T":60000,"c":10,"h":12.5,"l":9,"x":false}"#;
        let k: BinanceKline = serde_json::from_str(json).unwrap();
        assert_eq!(k.open, None);
        assert!((k.high - 12.5).abs() < f64::EPSILON);
        assert!(!k.is_final);
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let json = r#"{"T":60000,"c":"abc","h":"1","l":"0","x":true}"#;
        assert!(serde_json::from_str::<BinanceKline>(json).is_err());
    }

    #[test]
    fn header_tolerates_missing_fields() {
        let header: KlineEventHeader = serde_json::from_str(r#"{"result":null,"id":1}"#).unwrap();
        assert!(header.symbol.is_none());
        assert!(header.kline.is_none());
    }
}
