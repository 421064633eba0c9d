//! Box canonicalization through both formats, in process and against a live
//! server when `DATABASE_URL` is set.

use std::env;

use postgres::types::{FromSql, Type};
use postgres::{Client, NoTls, SimpleQueryMessage};
use zero_pgtype::normalize::{FixtureSource, LiteralSource, NormalizeTest, test_successful_normalize};
use zero_pgtype::{
    Error, FormatCode, FromWireValue, Nullable, Oid, PgBox, ToWireValue, TypeRegistry, Vec2, oid,
};

fn expected_box() -> PgBox {
    PgBox {
        p: [Vec2::new(7.1, 5.234), Vec2::new(3.14, 1.678)],
    }
}

fn cases() -> Vec<NormalizeTest<PgBox>> {
    vec![
        NormalizeTest::new("select '3.14, 1.678, 7.1, 5.234'::box", expected_box()),
        NormalizeTest::new("select '(3.14,1.678),(7.1,5.234)'::box", expected_box()),
        NormalizeTest::new("select '((7.1,5.234),(3.14,1.678))'::box", expected_box()),
    ]
}

#[test]
fn test_box_normalize_fixture() {
    let registry = TypeRegistry::with_builtins();
    let mut source = FixtureSource::new(&registry);
    test_successful_normalize(&mut source, &registry, &cases()).unwrap();
}

#[test]
fn test_nullable_box_normalize_fixture() {
    let registry = TypeRegistry::with_builtins();
    let mut source = FixtureSource::new(&registry);
    let cases = [
        NormalizeTest::new("select null::box", Nullable::<PgBox>::null()),
        NormalizeTest::new(
            "select '7.1, 5.234, 3.14, 1.678'::box",
            Nullable::new(expected_box()),
        ),
    ];
    test_successful_normalize(&mut source, &registry, &cases).unwrap();
}

#[test]
fn test_box_transcode() {
    let values = [
        PgBox {
            p: [Vec2::new(7.1, 5.2345678), Vec2::new(3.14, 1.678)],
        },
        PgBox {
            p: [Vec2::new(7.1, 5.2345678), Vec2::new(-13.14, -5.234)],
        },
    ];
    for value in values {
        for format in [FormatCode::Text, FormatCode::Binary] {
            let mut buf = Vec::new();
            value.encode_payload(oid::BOX, format, &mut buf).unwrap();
            let back = PgBox::from_wire(oid::BOX, format, Some(&buf)).unwrap();
            assert_eq!(back, value, "{format:?}");
        }
    }

    let null = Nullable::<PgBox>::from_wire(oid::BOX, FormatCode::Binary, None).unwrap();
    assert_eq!(null, Nullable::null());
}

#[test]
fn test_box_short_payload() {
    let registry = TypeRegistry::with_builtins();
    assert!(matches!(
        registry.decode(oid::BOX, FormatCode::Binary, Some(&[0; 24])),
        Err(Error::TruncatedValue { expected: 32, actual: 24, .. })
    ));
}

/// Result column of any type, kept as the raw bytes.
struct RawColumn(Option<Vec<u8>>);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawColumn(Some(raw.to_vec())))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawColumn(None))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

struct ServerSource {
    client: Client,
}

fn server_error(err: postgres::Error) -> Error {
    Error::InvalidUsage(err.to_string())
}

impl LiteralSource for ServerSource {
    fn fetch(&mut self, sql: &str, format: FormatCode) -> zero_pgtype::Result<(Oid, Option<Vec<u8>>)> {
        let statement = self.client.prepare(sql).map_err(server_error)?;
        let oid = statement.columns()[0].type_().oid();
        let bytes = match format {
            FormatCode::Binary => {
                let row = self.client.query_one(&statement, &[]).map_err(server_error)?;
                row.try_get::<_, RawColumn>(0).map_err(server_error)?.0
            }
            FormatCode::Text => self
                .client
                .simple_query(sql)
                .map_err(server_error)?
                .into_iter()
                .find_map(|message| match message {
                    SimpleQueryMessage::Row(row) => Some(row.get(0).map(|s| s.as_bytes().to_vec())),
                    _ => None,
                })
                .ok_or_else(|| Error::InvalidUsage(format!("no row returned by {sql}")))?,
        };
        Ok((oid, bytes))
    }
}

#[test]
fn test_box_normalize_server() {
    let Ok(url) = env::var("DATABASE_URL") else {
        return;
    };
    let client = Client::connect(&url, NoTls).expect("Failed to connect");
    let mut source = ServerSource { client };
    let registry = TypeRegistry::with_builtins();
    test_successful_normalize(&mut source, &registry, &cases()).unwrap();
}
