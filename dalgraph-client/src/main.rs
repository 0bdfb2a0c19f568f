use clap::Parser;
use reqwest::Client;
use rustyline::{error::ReadlineError, DefaultEditor};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,
}

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Query(&'a str),
    Sql(Option<&'a str>),
    Schema,
    Reload,
    Help,
    Unknown(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    if !input.starts_with(':') {
        return Command::Query(input);
    }
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (input, None),
    };
    match cmd {
        ":sql" => Command::Sql(arg),
        ":schema" | ":s" => Command::Schema,
        ":reload" | ":r" => Command::Reload,
        ":help" | ":h" => Command::Help,
        other => Command::Unknown(other),
    }
}

fn print_usage() {
    println!("dalgraph Client Commands:");
    println!("  <query>          - Execute GraphQL query (default)");
    println!("  :sql <query>     - Show the SQL a query would run, without running it");
    println!("  :schema          - Print the schema SDL");
    println!("  :reload          - Reload the catalog on the server");
    println!("  :help            - Show this help");
    println!();
    println!("Examples:");
    println!("  {{ orders(limit: 5) {{ id total }} }}");
    println!("  :sql {{ orders(sort: {{total: desc}}) {{ id customers {{ name }} }} }}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let client = Client::new();

    println!("\nConnected to dalgraph server at {}.", args.url);
    println!("Type :help for commands.\n");

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("dalgraph-client :) ");
        match readline {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(input)?;

                match parse_command(input) {
                    Command::Query(query) => match run_query(&client, &args.url, query).await {
                        Ok(response) => print_query_result(&response),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Command::Sql(Some(query)) => {
                        match generate_sql(&client, &args.url, query).await {
                            Ok(response) => print_sql_result(&response),
                            Err(e) => eprintln!("Error: {}", e),
                        }
                    }
                    Command::Sql(None) => println!("Usage: :sql <query>"),
                    Command::Schema => match fetch_schema(&client, &args.url).await {
                        Ok(sdl) => println!("\n{}\n", sdl),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Command::Reload => match reload_schema(&client, &args.url).await {
                        Ok(response) => println!(
                            "\n{}\n",
                            serde_json::to_string_pretty(&response).unwrap_or_default()
                        ),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Command::Help => print_usage(),
                    Command::Unknown(cmd) => println!(
                        "Unknown command: {}. Type :help for available commands.",
                        cmd
                    ),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nBye");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

fn print_query_result(response: &Value) {
    if let Some(data) = response.get("data").filter(|d| !d.is_null()) {
        println!(
            "\n{}\n",
            serde_json::to_string_pretty(data).unwrap_or_default()
        );
    }
    print_errors(response);
}

fn print_sql_result(response: &Value) {
    if let Some(statements) = response.get("sql").and_then(|s| s.as_array()) {
        println!();
        for statement in statements {
            println!("{}", statement.as_str().unwrap_or_default());
        }
        println!();
    }
    print_errors(response);
}

fn print_errors(response: &Value) {
    if let Some(errors) = response.get("errors").and_then(|e| e.as_array()) {
        for error in errors {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("?");
            let code = error
                .pointer("/extensions/code")
                .and_then(|c| c.as_str())
                .unwrap_or("ERROR");
            match error.get("path") {
                Some(path) => eprintln!("{} at {}: {}", code, path, message),
                None => eprintln!("{}: {}", code, message),
            }
        }
    }
}

async fn post_json(client: &Client, endpoint: &str, payload: &Value) -> Result<Value, String> {
    let response = client
        .post(endpoint)
        .json(payload)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(text)
    }
}

async fn run_query(client: &Client, url: &str, query: &str) -> Result<Value, String> {
    post_json(client, &format!("{}/graphql", url), &json!({ "query": query })).await
}

async fn generate_sql(client: &Client, url: &str, query: &str) -> Result<Value, String> {
    post_json(client, &format!("{}/graphql/sql", url), &json!({ "query": query })).await
}

async fn reload_schema(client: &Client, url: &str) -> Result<Value, String> {
    post_json(client, &format!("{}/schema/reload", url), &json!({})).await
}

async fn fetch_schema(client: &Client, url: &str) -> Result<String, String> {
    let response = client
        .get(format!("{}/schema", url))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let success = response.status().is_success();
    let text = response.text().await.map_err(|e| e.to_string())?;
    if success {
        Ok(text)
    } else {
        Err(text)
    }
}
