use anyhow::{Context, Result};
use serde_json::Value;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tracing::{debug, info};

/// How a repeated page fragment is located in the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    XPath(&'static str),
    Css(&'static str),
    Tag(&'static str),
}

/// Key events sent to the page. Values are WebDriver key code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keystroke {
    PageDown,
}

impl Keystroke {
    pub fn code(self) -> &'static str {
        match self {
            Keystroke::PageDown => "\u{E00F}",
        }
    }
}

/// The browser capabilities the crawler needs. Every call is one blocking
/// round trip to the automation backend; callers await them in sequence.
pub trait PageDriver {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn send_key(&self, target: Selector, key: Keystroke) -> Result<()>;
    async fn execute(&self, script: &str) -> Result<Value>;
    /// Rendered text of every element matching `selector`, in document order.
    async fn find_texts(&self, selector: Selector) -> Result<Vec<String>>;
    async fn quit(self) -> Result<()>;
}

/// A Chrome session behind a WebDriver server (chromedriver).
pub struct ChromeSession {
    driver: WebDriver,
}

impl ChromeSession {
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .with_context(|| format!("Failed to start browser session via {}", webdriver_url))?;
        info!("Browser session started (headless={})", headless);
        Ok(Self { driver })
    }
}

fn by(selector: Selector) -> By {
    match selector {
        Selector::XPath(xpath) => By::XPath(xpath),
        Selector::Css(css) => By::Css(css),
        Selector::Tag(tag) => By::Tag(tag),
    }
}

impl PageDriver for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.driver
            .goto(url)
            .await
            .with_context(|| format!("Failed to open {}", url))
    }

    async fn send_key(&self, target: Selector, key: Keystroke) -> Result<()> {
        let element = self
            .driver
            .find(by(target))
            .await
            .with_context(|| format!("No element for {:?}", target))?;
        element.send_keys(key.code()).await?;
        Ok(())
    }

    async fn execute(&self, script: &str) -> Result<Value> {
        let ret = self.driver.execute(script, Vec::new()).await?;
        let value: Value = ret.convert()?;
        Ok(value)
    }

    async fn find_texts(&self, selector: Selector) -> Result<Vec<String>> {
        let elements = self.driver.find_all(by(selector)).await?;
        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn quit(self) -> Result<()> {
        self.driver.quit().await?;
        debug!("Browser session closed");
        Ok(())
    }
}
