//! Integration tests for Coffee Shop

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Binary pointed at a scratch config file and state directory
    fn shop(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("coffeeshop");
        cmd.env("CI", "1")
            .env_remove("COFFEESHOP_CONFIG")
            .env_remove("COFFEESHOP_DATA_DIR")
            .arg("--config")
            .arg(temp.path().join("config.toml"))
            .arg("--data-dir")
            .arg(temp.path().join("state"));
        cmd
    }

    /// Local storefront answering every path with 200 and the path as body
    fn storefront() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                thread::spawn(move || {
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).unwrap();
                    let mut line = String::new();
                    while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                        line.clear();
                    }

                    let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let body = format!("served {}", path);
                    write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                    .unwrap();
                });
            }
        });

        format!("http://{}/", addr)
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("coffeeshop")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline-first storefront worker"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("coffeeshop")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("coffeeshop"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[worker]"))
            .stdout(predicate::str::contains("coffee-shop-cache-"));
    }

    #[test]
    fn config_set_then_show() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "set", "worker.cache_version", "v2"])
            .assert()
            .success();

        shop(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache_version = \"v2\""));
    }

    #[test]
    fn config_set_does_not_persist_data_dir_override() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        cargo_bin_cmd!("coffeeshop")
            .env("CI", "1")
            .env_remove("COFFEESHOP_DATA_DIR")
            .arg("--config")
            .arg(&config_path)
            .arg("--data-dir")
            .arg(temp.path().join("one-off"))
            .args(["config", "set", "worker.cache_version", "v2"])
            .assert()
            .success();

        let written = fs::read_to_string(&config_path).unwrap();
        assert!(written.contains("cache_version = \"v2\""));
        assert!(!written.contains("one-off"));
        assert!(!written.contains("data_dir"));
    }

    #[test]
    fn config_set_empty_cache_prefix_fails() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "set", "worker.cache_prefix", ""])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache prefix"));

        assert!(!temp.path().join("config.toml").exists());
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn cart_add_show_remove() {
        let temp = TempDir::new().unwrap();
        shop(&temp).args(["cart", "add", "Latte", "4.50"]).assert().success();
        shop(&temp).args(["cart", "add", "Latte", "4.50"]).assert().success();
        shop(&temp).args(["cart", "add", "Mocha", "5"]).assert().success();

        shop(&temp)
            .args(["cart", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Latte  $4.50 x 2"))
            .stdout(predicate::str::contains("Total: $14.00"));

        shop(&temp).args(["cart", "remove", "Latte"]).assert().success();
        shop(&temp)
            .args(["cart", "show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Mocha"))
            .stdout(predicate::str::contains("Latte").not());
    }

    #[test]
    fn cart_remove_missing_item() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["cart", "remove", "Latte"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Record not found"));
    }

    #[test]
    fn checkout_registers_sync() {
        let temp = TempDir::new().unwrap();
        shop(&temp).args(["cart", "add", "Espresso", "2.5"]).assert().success();

        shop(&temp)
            .args([
                "checkout",
                "--name",
                "Ada",
                "--email",
                "ada@example.com",
                "--address",
                "1 Bean St",
                "--phone",
                "555-0100",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Order 1 submitted"));

        shop(&temp)
            .args(["sync", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("checkoutDataSync"));

        shop(&temp)
            .arg("sync")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 order(s) pending upload"));

        shop(&temp)
            .args(["sync", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No pending sync registrations"));

        let db = fs::read_to_string(temp.path().join("state").join("db.json")).unwrap();
        assert!(db.contains("\"phoneNumber\": \"555-0100\""));
    }

    #[test]
    fn checkout_without_details_fails() {
        let temp = TempDir::new().unwrap();
        shop(&temp).args(["cart", "add", "Espresso", "2.5"]).assert().success();

        shop(&temp)
            .args(["checkout", "--name", "Ada"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--email"));
    }

    #[test]
    fn checkout_empty_cart_fails() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["checkout", "--name", "Ada"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cart is empty"));
    }

    #[test]
    fn push_shows_notification() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["push", "Fresh roast today"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Coffee Shop"))
            .stdout(predicate::str::contains("Fresh roast today"));
    }

    #[test]
    fn status_before_install() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("coffee-shop-cache-v1"))
            .stdout(predicate::str::contains("parsed"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache generations found"));
    }

    #[test]
    fn activate_before_install_fails() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("coffeeshop install"));
    }

    #[test]
    fn install_against_unreachable_origin_fails() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "set", "worker.origin", "http://127.0.0.1:9/"])
            .assert()
            .success();

        shop(&temp)
            .args(["config", "set", "worker.manifest", "/,offline.html"])
            .assert()
            .success();

        shop(&temp)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache population failed"));

        shop(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("redundant"));
    }

    #[test]
    fn install_then_fetch_from_cache() {
        let temp = TempDir::new().unwrap();
        let origin = storefront();
        shop(&temp)
            .args(["config", "set", "worker.origin", &origin])
            .assert()
            .success();
        shop(&temp)
            .args(["config", "set", "worker.manifest", "/,offline.html"])
            .assert()
            .success();

        shop(&temp).arg("install").assert().success();

        shop(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("activated"))
            .stdout(predicate::str::contains("2 entries"));

        shop(&temp)
            .args(["fetch", "offline.html"])
            .assert()
            .success()
            .stdout(predicate::str::contains("served /offline.html"))
            .stderr(predicate::str::contains("(cache)"));

        shop(&temp)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("coffee-shop-cache-v1"));
    }

    #[test]
    fn fetch_before_install_goes_to_network() {
        let temp = TempDir::new().unwrap();
        shop(&temp)
            .args(["config", "set", "worker.origin", "http://127.0.0.1:9/"])
            .assert()
            .success();

        shop(&temp)
            .args(["fetch", "menu.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("http://127.0.0.1:9/menu.html"));
    }

    #[test]
    fn completions_bash() {
        cargo_bin_cmd!("coffeeshop")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("coffeeshop"));
    }
}
