use tracing::info;

use crate::config::{Config, Credentials};
use crate::error::{AppError, Result};
use crate::page::{PageCapability, WaitPolicy};

/// Sign in through the site's login form.
///
/// The site may put a CAPTCHA in front of the form submission, so after
/// submitting this waits (up to the configured login timeout) for the
/// signed-in feed to show up. Expiry is reported as `LoginTimeout`.
pub async fn login(page: &dyn PageCapability, credentials: &Credentials, config: &Config) -> Result<()> {
    let sel = &config.selectors;

    info!("Loading main page...");
    page.navigate(&config.login_url(), WaitPolicy::DomContentLoaded)
        .await?;
    if !page
        .wait_for_element(&sel.login_form, config.timing.page_ready())
        .await?
    {
        return Err(AppError::Page("Login form did not render".to_string()));
    }

    info!("Logging in...");
    page.type_text(&sel.login_username, &credentials.username)
        .await?;
    page.type_text(&sel.login_password, &credentials.password)
        .await?;
    page.click(&sel.login_submit).await?;

    info!("Waiting for reCAPTCHA...");
    let timeout = config.timing.login_timeout();
    if !page.wait_for_element(&sel.feed_container, timeout).await? {
        return Err(AppError::LoginTimeout(timeout));
    }

    info!("Logged in.");
    Ok(())
}
