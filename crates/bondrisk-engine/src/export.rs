//! CSV export of portfolio holdings.

use std::io::Write;

use serde::Serialize;

use bondrisk_core::Portfolio;

/// Column order of the export.
pub const CSV_HEADER: [&str; 6] = ["BondId", "BondName", "Coupon", "Maturity", "Price", "Quantity"];

#[derive(Serialize)]
struct BondRow<'a> {
    bond_id: i64,
    bond_name: &'a str,
    coupon: String,
    maturity: String,
    price: String,
    quantity: i64,
}

/// Write one row per bond across `portfolios`, in portfolio then bond order.
///
/// The header row is written even when there are no bonds.
pub fn write_portfolio_csv<W: Write>(out: W, portfolios: &[Portfolio]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for bond in portfolios.iter().flat_map(|p| p.bonds.iter()) {
        writer.serialize(BondRow {
            bond_id: bond.id.get(),
            bond_name: &bond.name,
            coupon: bond.coupon.normalize().to_string(),
            maturity: bond.maturity.format("%Y-%m-%d").to_string(),
            price: bond.price.normalize().to_string(),
            quantity: bond.quantity,
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use bondrisk_core::{BondId, NewBond, PortfolioId, UserId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn render(portfolios: &[Portfolio]) -> String {
        let mut buf = Vec::new();
        write_portfolio_csv(&mut buf, portfolios).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(render(&[]), "BondId,BondName,Coupon,Maturity,Price,Quantity\n");
    }

    #[test]
    fn test_rows_and_quoting() {
        let mut p = Portfolio::new(PortfolioId::new(1), "Default", UserId::new(1));
        p.insert_bond(
            NewBond {
                name: "UST 4.25 2030".into(),
                coupon: dec!(0.0425),
                maturity: NaiveDate::from_ymd_opt(2030, 2, 15).unwrap(),
                price: dec!(99.500),
                quantity: 10,
            }
            .with_id(BondId::new(7)),
        );
        p.insert_bond(
            NewBond {
                name: "Acme, Inc 5%".into(),
                coupon: dec!(0.05),
                maturity: NaiveDate::from_ymd_opt(2028, 6, 1).unwrap(),
                price: dec!(101),
                quantity: 3,
            }
            .with_id(BondId::new(8)),
        );

        let csv = render(&[p]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "7,UST 4.25 2030,0.0425,2030-02-15,99.5,10");
        assert_eq!(lines[2], "8,\"Acme, Inc 5%\",0.05,2028-06-01,101,3");
    }
}
