//! # Register Console
//!
//! Line-oriented front end over [`Register`]. Each line is one command; the
//! reply is plain text.
//!
//! ```text
//! kiosko> open 100.00
//! Session 5f0c… opened: counted S/100.00, expected S/100.00, difference S/0.00
//! kiosko> new
//! kiosko> add var-tshirt-m
//! kiosko> qty 1 2
//! kiosko> step 3
//! kiosko> client dt-dni 45123987
//! kiosko> step 5
//! kiosko> pay pm-cash 60.00
//! kiosko> submit
//! Order 9b1e… committed. Change S/10.00
//! ```

use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use kiosko_core::{CustomerData, LocationLevel, Money, ShippingUpdate};

use crate::error::{ApiError, ApiResult};
use crate::register::Register;
use crate::snapshot::SaleSnapshot;

const HELP: &str = "\
Cash session
  open <amount> [notes]         open the drawer with the counted cash
  close <counted> [notes]       close the drawer
  session                       show the open session
Sale
  new                           start a sale
  config <price-list> <warehouse> [stock-type]
  step <1-5>                    go to a wizard step
  search <text>                 search products
  add <variation-id>            add one unit
  qty <line> <qty> [discount]   set quantity (and discount) of a line
  rm <line>                     remove a line
  client <doc-type> <doc-no>    load a known customer
  customer <doc-type> <doc-no> <name...>
  delivery on|off               customer requires shipping
  locations <level> [parent]    list countries, states, cities, neighborhoods
  ship <country> <state> <city> <neighborhood> <method> [address]
  methods                       list payment methods
  pay <method> <amount> [code]  add a payment
  unpay <payment-id>            remove a payment
  submit                        commit the order
  reset                         start the sale over
  show                          show the sale
  receipt [order-id]            print a receipt
  quit";

/// Output of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Console {
    register: Register,
    currency: String,
}

impl Console {
    pub fn new(register: Register) -> Self {
        let currency = register.config().store.currency_symbol.clone();
        Console { register, currency }
    }

    /// Reads stdin until EOF or `quit`.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stdout
            .write_all(b"Kiosko register. Type 'help' for commands.\nkiosko> ")
            .await?;
        stdout.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let text = match self.execute(&line).await {
                Ok(Reply::Quit) => break,
                Ok(Reply::Text(text)) => text,
                Err(e) => format!("error [{:?}]: {}", e.code, e.message),
            };
            if !text.is_empty() {
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            stdout.write_all(b"kiosko> ").await?;
            stdout.flush().await?;
        }
        Ok(())
    }

    /// Runs one command line.
    pub async fn execute(&self, line: &str) -> ApiResult<Reply> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((command, args)) = words.split_first() else {
            return Ok(Reply::Text(String::new()));
        };
        debug!(command = %command, "Console command");

        let text = match *command {
            "help" | "?" => HELP.to_string(),
            "quit" | "exit" => return Ok(Reply::Quit),

            "open" => {
                let amount = parse_money(arg(args, 0, "amount")?)?;
                let notes = rest(args, 1);
                let session = self.register.open_session(amount, notes.as_deref()).await?;
                format!(
                    "Session {} opened: counted {}, expected {}, difference {}",
                    session.id,
                    self.money(session.opening_amount),
                    self.money(session.expected_amount),
                    self.money(session.opening_difference)
                )
            }
            "close" => {
                let counted = parse_money(arg(args, 0, "counted amount")?)?;
                let notes = rest(args, 1);
                let closed = self.register.close_session(counted, notes.as_deref()).await?;
                format!(
                    "Session {} closed: expected {}, counted {}, difference {}",
                    closed.session_id,
                    self.money(closed.expected),
                    self.money(closed.counted),
                    self.money(closed.difference)
                )
            }
            "session" => match self.register.current_session().await? {
                Some(s) => format!(
                    "Session {} OPEN since {}: opening {}, sales {}, expected now {}",
                    s.id,
                    s.opened_at.format("%Y-%m-%d %H:%M"),
                    self.money(s.opening_amount),
                    self.money(s.recorded_sales_total),
                    self.money(s.expected_now())
                ),
                None => "No open session".to_string(),
            },

            "new" => self.render(&self.register.start_sale().await?),
            "config" => {
                let price_list = arg(args, 0, "price list")?;
                let warehouse = arg(args, 1, "warehouse")?;
                let sale = self
                    .register
                    .configure_sale(price_list, warehouse, args.get(2).copied())
                    .await?;
                self.render(&sale)
            }
            "step" => {
                let number: u8 = parse(arg(args, 0, "step")?, "step")?;
                self.render(&self.register.go_to_step(number).await?)
            }
            "search" => {
                let query = args.join(" ");
                let products = self.register.search_products(&query).await?;
                if products.is_empty() {
                    "No products found".to_string()
                } else {
                    products
                        .iter()
                        .map(|p| {
                            format!(
                                "{:<16} {:<24} {:>10}  stock {}",
                                p.variation_id,
                                p.name,
                                self.money(p.unit_price()),
                                p.stock
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            "add" => {
                let update = self.register.add_to_cart(arg(args, 0, "variation")?).await?;
                format!("{:?}\n{}", update.outcome, self.render(&update.sale))
            }
            "qty" => {
                let index = line_index(arg(args, 0, "line")?)?;
                let quantity: i64 = parse(arg(args, 1, "quantity")?, "quantity")?;
                let discount = args.get(2).map(|d| parse_money(d)).transpose()?;
                self.render(&self.register.update_cart_item(index, quantity, discount).await?)
            }
            "rm" => {
                let index = line_index(arg(args, 0, "line")?)?;
                self.render(&self.register.remove_from_cart(index).await?)
            }

            "client" => {
                let doc_type = arg(args, 0, "document type")?;
                let doc_number = arg(args, 1, "document number")?;
                match self.register.search_client(doc_type, doc_number).await? {
                    Some(found) => self.render(&self.register.update_customer(found).await?),
                    None => "Customer not found; enter it with 'customer'".to_string(),
                }
            }
            "customer" => {
                let doc_type = arg(args, 0, "document type")?;
                let doc_number = arg(args, 1, "document number")?;
                let name = rest(args, 2).unwrap_or_default();
                let (first, last) = name.split_once(' ').unwrap_or((name.as_str(), ""));
                let current = self.register.snapshot().await?.customer;
                let customer = CustomerData {
                    customer_id: None,
                    document_type_id: Some(doc_type.to_string()),
                    document_number: doc_number.to_string(),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    requires_shipping: current.requires_shipping,
                    ..Default::default()
                };
                self.render(&self.register.update_customer(customer).await?)
            }
            "delivery" => {
                let on = match arg(args, 0, "on|off")? {
                    "on" => true,
                    "off" => false,
                    other => return Err(ApiError::validation(format!("expected on or off, got {}", other))),
                };
                let mut customer = self.register.snapshot().await?.customer;
                customer.requires_shipping = on;
                self.render(&self.register.update_customer(customer).await?)
            }
            "locations" => {
                let level = LocationLevel::from_str(arg(args, 0, "level")?)?;
                let locations = self.register.locations(level, args.get(1).copied()).await?;
                locations
                    .iter()
                    .map(|l| format!("{:<12} {}", l.id, l.name))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            "ship" => {
                let update = ShippingUpdate {
                    country_id: Some(arg(args, 0, "country")?.to_string()),
                    state_id: Some(arg(args, 1, "state")?.to_string()),
                    city_id: Some(arg(args, 2, "city")?.to_string()),
                    neighborhood_id: Some(arg(args, 3, "neighborhood")?.to_string()),
                    shipping_method_id: Some(arg(args, 4, "method")?.to_string()),
                    address: rest(args, 5),
                    reference: None,
                };
                self.render(&self.register.update_shipping(update).await?)
            }

            "methods" => self
                .register
                .payment_methods()
                .await?
                .iter()
                .map(|m| format!("{:<12} {}{}", m.id, m.name, if m.is_cash { " (cash)" } else { "" }))
                .collect::<Vec<_>>()
                .join("\n"),
            "pay" => {
                let method = arg(args, 0, "method")?;
                let amount = parse_money(arg(args, 1, "amount")?)?;
                let code = args.get(2).map(|c| c.to_string());
                self.render(&self.register.add_payment(method, amount, code, None).await?)
            }
            "unpay" => {
                let id: u64 = parse(arg(args, 0, "payment id")?, "payment id")?;
                self.render(&self.register.remove_payment(id).await?)
            }
            "submit" => {
                let result = self.register.submit_order().await?;
                format!(
                    "Order {} committed. Change {}",
                    result.order_id,
                    self.money(result.sale.totals.change_amount)
                )
            }
            "reset" => self.render(&self.register.reset_all().await?),
            "show" => self.render(&self.register.snapshot().await?),
            "receipt" => {
                let order_id = match args.first() {
                    Some(id) => id.to_string(),
                    None => self
                        .register
                        .snapshot()
                        .await?
                        .completed_order_id
                        .ok_or_else(|| ApiError::validation("No completed order; pass an order id"))?,
                };
                self.register.receipt(&order_id).await?
            }

            other => format!("Unknown command '{}'. Type 'help'.", other),
        };

        Ok(Reply::Text(text))
    }

    fn money(&self, amount: Money) -> String {
        format!("{}{}", self.currency, amount)
    }

    fn render(&self, sale: &SaleSnapshot) -> String {
        let mut out = Vec::new();

        let steps = sale
            .steps
            .iter()
            .map(|s| {
                let mark = if s.step == sale.step {
                    ">"
                } else if s.complete {
                    "+"
                } else {
                    " "
                };
                format!("{}{} {}", mark, s.number.unwrap_or_default(), s.step)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        out.push(format!("[{}] {}", sale.step, steps));

        for (i, line) in sale.lines.iter().enumerate() {
            out.push(format!(
                "  {:>2}. {:<24} x{:<3} {:>10}",
                i + 1,
                line.name,
                line.quantity,
                self.money(line.total())
            ));
        }
        for p in &sale.payments {
            out.push(format!("  #{} {:<20} {:>10}", p.local_id, p.method_name, self.money(p.amount)));
        }

        let t = &sale.totals;
        out.push(format!(
            "  total {}  paid {}  pending {}  change {}",
            self.money(t.total),
            self.money(t.total_paid),
            self.money(t.pending_amount),
            self.money(t.change_amount)
        ));
        if let Some(error) = &sale.last_error {
            out.push(format!("  last error: {}", error));
        }
        out.join("\n")
    }
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> ApiResult<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| ApiError::validation(format!("missing {}", name)))
}

fn rest(args: &[&str], from: usize) -> Option<String> {
    (args.len() > from).then(|| args[from..].join(" "))
}

fn parse<T: FromStr>(value: &str, name: &str) -> ApiResult<T> {
    value
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid {}: {}", name, value)))
}

fn parse_money(value: &str) -> ApiResult<Money> {
    Ok(Money::from_str(value)?)
}

/// Operator line numbers start at 1.
fn line_index(value: &str) -> ApiResult<usize> {
    let number: usize = parse(value, "line")?;
    number
        .checked_sub(1)
        .ok_or_else(|| ApiError::validation("line numbers start at 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegisterConfig;
    use kiosko_db::seed::seed_demo_data;
    use kiosko_db::{Database, DbConfig, SqliteStore};
    use std::sync::Arc;

    async fn console() -> Console {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        Console::new(Register::new(
            Arc::new(SqliteStore::new(db)),
            RegisterConfig::default(),
        ))
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[tokio::test]
    async fn test_blank_line_and_quit() {
        let console = console().await;
        assert_eq!(console.execute("   ").await.unwrap(), Reply::Text(String::new()));
        assert_eq!(console.execute("quit").await.unwrap(), Reply::Quit);
    }

    #[tokio::test]
    async fn test_cash_sale_end_to_end() {
        let console = console().await;
        console.execute("open 100.00").await.unwrap();
        console.execute("new").await.unwrap();
        console.execute("step 2").await.unwrap();
        console.execute("add var-tshirt-m").await.unwrap();
        console.execute("qty 1 2").await.unwrap();
        console.execute("step 3").await.unwrap();
        console.execute("client dt-dni 45123987").await.unwrap();
        console.execute("step 5").await.unwrap();
        console.execute("pay pm-cash 60.00").await.unwrap();

        let reply = text(console.execute("submit").await.unwrap());
        assert!(reply.contains("Change S/10.00"), "{}", reply);

        let receipt = text(console.execute("receipt").await.unwrap());
        assert!(receipt.contains("T-Shirt M"));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_validation_errors() {
        let console = console().await;
        let err = console.execute("open ten").await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let err = console.execute("qty 0 1").await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let console = console().await;
        let reply = text(console.execute("dance").await.unwrap());
        assert!(reply.starts_with("Unknown command"));
    }
}
