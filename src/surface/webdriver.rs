use crate::config::ListingConfig;
use crate::error::{Result, ScrapeError};
use crate::surface::RenderSurface;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Common alternative endpoints tried when the configured one refuses
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Rendering surface backed by a WebDriver session
pub struct WebDriverSurface {
    client: Client,
}

impl WebDriverSurface {
    /// Connects to the configured WebDriver, falling back to common local endpoints
    pub async fn connect(config: &ListingConfig) -> Result<Self> {
        let capabilities = chrome_capabilities(config);

        match connect_once(&config.webdriver_url, &capabilities).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", config.webdriver_url);
                return Ok(Self { client });
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    config.webdriver_url,
                    e
                );
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS.iter() {
            if *url == config.webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = connect_once(url, &capabilities).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(Self { client });
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(ScrapeError::Driver(format!(
            "no WebDriver server reachable at {} or fallbacks",
            config.webdriver_url
        )))
    }
}

async fn connect_once(url: &str, capabilities: &Map<String, Value>) -> Result<Client> {
    let client = ClientBuilder::native()
        .capabilities(capabilities.clone())
        .connect(url)
        .await?;
    Ok(client)
}

/// Chrome flags used for every session
fn chrome_capabilities(config: &ListingConfig) -> Map<String, Value> {
    let mut args = vec![
        "--disable-gpu".to_string(),
        "--start-maximized".to_string(),
        "--log-level=3".to_string(),
        format!("--user-agent={}", config.user_agent),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }

    let mut capabilities = Map::new();
    capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    capabilities
}

#[async_trait]
impl RenderSurface for WebDriverSurface {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn current_markup(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn wait_for(&self, selector: &str, within: Duration) -> Result<Option<Element>> {
        match self
            .client
            .wait()
            .at_most(within)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(element) => Ok(Some(element)),
            Err(CmdError::WaitTimeout) => Ok(None),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn type_and_submit(&self, element: &Element, text: &str) -> Result<()> {
        element.clear().await?;
        element.send_keys(text).await?;
        element.send_keys(&char::from(Key::Enter).to_string()).await?;
        Ok(())
    }

    async fn activate(&self, element: &Element) -> Result<()> {
        let handle =
            serde_json::to_value(element).map_err(|e| ScrapeError::Driver(e.to_string()))?;
        self.client
            .execute("arguments[0].click();", vec![handle])
            .await?;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}
