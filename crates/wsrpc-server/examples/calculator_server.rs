//! # Calculator Server Example
//!
//! Serves a small calculator over JSON-RPC 2.0 on WebSocket. Every connection
//! gets its own `Calculator`, so the running total is private to the client
//! that built it up.
//!
//! ```bash
//! cargo run -p wsrpc-server --example calculator_server -- --port 9000 --offset 1
//! websocat ws://127.0.0.1:9000
//! {"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}
//! ```

use std::net::IpAddr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wsrpc_server::{
    FrameFormat, JsonRpcException, Listener, MethodTable, ParamType, RpcTarget, ServerConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (0 picks a free one)
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Constant added to every `add` result
    #[arg(long, default_value = "0")]
    offset: f64,

    /// Reply with binary frames instead of text frames
    #[arg(long, default_value = "false")]
    binary: bool,
}

/// Construction arguments shared by every connection's calculator
#[derive(Debug, Clone)]
struct CalculatorOptions {
    offset: f64,
}

#[derive(Default)]
struct Calculator {
    offset: f64,
    total: f64,
}

impl From<CalculatorOptions> for Calculator {
    fn from(options: CalculatorOptions) -> Self {
        Self {
            offset: options.offset,
            total: 0.0,
        }
    }
}

static CALCULATOR_METHODS: Lazy<MethodTable<Calculator>> = Lazy::new(|| {
    MethodTable::new()
        .method(
            "add",
            &[ParamType::Number, ParamType::Number],
            |calc: &mut Calculator, args| {
                let a: f64 = args.get(0)?;
                let b: f64 = args.get(1)?;
                Ok(a + b + calc.offset)
            },
        )
        .method(
            "divide",
            &[ParamType::Number, ParamType::Number],
            |_calc: &mut Calculator, args| {
                let a: f64 = args.get(0)?;
                let b: f64 = args.get(1)?;
                if b == 0.0 {
                    return Err(JsonRpcException::invocation_failed("division by zero"));
                }
                Ok(a / b)
            },
        )
        .method("accumulate", &[ParamType::Number], |calc: &mut Calculator, args| {
            let value: f64 = args.get(0)?;
            calc.total += value;
            Ok(calc.total)
        })
        .method("total", &[], |calc: &mut Calculator, _| Ok(calc.total))
        .method("reset", &[], |calc: &mut Calculator, _| {
            calc.total = 0.0;
            Ok(Value::Null)
        })
        .method("describe", &[], |calc: &mut Calculator, _| {
            Ok(json!({
                "offset": calc.offset,
                "total": calc.total,
                "methods": CALCULATOR_METHODS.method_names(),
            }))
        })
});

#[async_trait]
impl RpcTarget for Calculator {
    async fn invoke(
        &mut self,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, JsonRpcException> {
        CALCULATOR_METHODS.invoke(self, method, arguments)
    }

    fn method_names(&self) -> Vec<String> {
        CALCULATOR_METHODS.method_names()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let reply_format = if args.binary {
        FrameFormat::Binary
    } else {
        FrameFormat::Text
    };
    let config = ServerConfig::default()
        .bind_ip(args.bind)
        .reply_format(reply_format);

    let mut listener: Listener<Calculator> = Listener::new(config);
    listener.construct_with(CalculatorOptions {
        offset: args.offset,
    });

    let addr = listener
        .start(args.port)
        .await
        .with_context(|| format!("failed to start calculator server on port {}", args.port))?;
    info!("Calculator server ready at ws://{}", addr);

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for ctrl-c")?;

    info!(
        "Stopping calculator server ({} active connections)",
        listener.active_connections().await
    );
    listener.shutdown();
    Ok(())
}
