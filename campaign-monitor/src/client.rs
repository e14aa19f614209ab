use crate::{
    config::Config,
    endpoints::{Endpoint, Endpoints, Method},
    error::Error,
    models::{ApiResponse, CampaignMonitorError, Payload, Subscriber, SubscriberPage},
    transport::{HttpRequest, Transport},
};
use async_gen::gen;
use futures_core::Stream;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info_span, instrument, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(usize);

impl PageSize {
    /// Campaign Monitor accepts page sizes between 10 and 1000.
    pub fn new(size: usize) -> Self {
        Self(size.clamp(10, 1000))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(100)
    }
}

/// A Campaign Monitor client bound to one subscriber list.
#[derive(Clone, Debug)]
pub struct Client<T = reqwest::Client> {
    config: Config,
    endpoints: Endpoints,
    http: T,
    page_size: PageSize,
}

impl Client {
    /// Initializes a client backed by `reqwest` with a 10 second timeout.
    ///
    /// ## Example
    ///
    /// ```no_run
    /// use campaign_monitor::{Client, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = Config::new("list-id", "base64-token")?;
    ///     let client = Client::new(config)?;
    ///     let resp = client
    ///         .add_subscriber(r#"{"EmailAddress":"jane@example.com","Resubscribe":true,"ConsentToTrack":"Yes"}"#)
    ///         .await?;
    ///     println!("{resp}");
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Self::with_transport(config, http)
    }
}

impl<T: Transport> Client<T> {
    /// Initializes a client that sends its requests through `http`.
    pub fn with_transport(config: Config, http: T) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            endpoints: Endpoints::new(&config.base_url),
            config,
            http,
            page_size: Default::default(),
        })
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn list_id(&self) -> &str {
        &self.config.list_id
    }

    /// Adds a subscriber to the configured list.
    ///
    /// See <https://www.campaignmonitor.com/api/subscribers/#adding_a_subscriber>
    #[instrument(skip(self, payload), fields(list_id = %self.config.list_id))]
    pub async fn add_subscriber<P: Into<Payload>>(&self, payload: P) -> Result<ApiResponse, Error> {
        let endpoint = self
            .endpoints
            .build_subscriber_endpoint(&self.config.list_id);
        self.invoke(&endpoint, Some(payload.into())).await
    }

    /// Updates the subscriber currently registered as `email`.
    ///
    /// See <https://www.campaignmonitor.com/api/subscribers/#updating_a_subscriber>
    #[instrument(skip(self, payload), fields(list_id = %self.config.list_id))]
    pub async fn update_subscriber<P: Into<Payload>>(
        &self,
        payload: P,
        email: &str,
    ) -> Result<ApiResponse, Error> {
        let endpoint = self
            .endpoints
            .build_update_endpoint(&self.config.list_id, email);
        self.invoke(&endpoint, Some(payload.into())).await
    }

    /// Sends the smart email identified by `template_id`.
    ///
    /// See <https://www.campaignmonitor.com/api/transactional/#send_a_smart_email>
    #[instrument(skip(self, payload))]
    pub async fn send_transactional_email<P: Into<Payload>>(
        &self,
        template_id: &str,
        payload: P,
    ) -> Result<ApiResponse, Error> {
        let endpoint = self.endpoints.build_transactional_endpoint(template_id);
        self.invoke(&endpoint, Some(payload.into())).await
    }

    /// Fetches the details of a single subscriber of the configured list.
    #[instrument(skip(self), fields(list_id = %self.config.list_id))]
    pub async fn get_subscriber(&self, email: &str) -> Result<Subscriber, Error> {
        let endpoint = self
            .endpoints
            .build_subscriber_details_endpoint(&self.config.list_id, email);
        let resp = self.invoke(&endpoint, None).await?;
        resp.parse().map_err(|e| {
            error!(%endpoint, error = %e, "unexpected subscriber document");
            Error::ResponseParse(e)
        })
    }

    /// Streams every active subscriber of the configured list, one page
    /// request at a time. The stream ends after the last page or right after
    /// yielding the first error.
    ///
    /// ## Example
    ///
    /// ```no_run
    /// use campaign_monitor::{Client, Config};
    /// use futures_util::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new(Config::new("list-id", "base64-token")?)?;
    ///     let mut stream = std::pin::pin!(client.active_subscribers());
    ///     while let Some(res) = stream.next().await {
    ///         match res {
    ///             Ok(subscriber) => println!("{}", subscriber.email_address),
    ///             Err(err) => eprintln!("{err}"),
    ///         }
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn active_subscribers(&self) -> impl Stream<Item = Result<Subscriber, Error>> + '_ {
        let span = info_span!("active_subscribers", list_id = %self.config.list_id);
        let g = gen! {
            let mut page = 1;
            loop {
                let endpoint = self.endpoints.build_active_subscribers_endpoint(
                    &self.config.list_id,
                    page,
                    self.page_size.0,
                );

                let resp = match self
                    .invoke(&endpoint, None)
                    .instrument(span.clone())
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                let body: SubscriberPage = match resp.parse() {
                    Ok(b) => b,
                    Err(e) => {
                        span.in_scope(|| {
                            error!(%endpoint, error = %e, "unexpected subscriber page")
                        });
                        yield Err(Error::ResponseParse(e));
                        break;
                    }
                };

                if body.results.is_empty() {
                    break;
                }

                let last_page = page >= body.number_of_pages;
                for subscriber in body.results.into_iter() {
                    yield Ok(subscriber);
                }

                if last_page {
                    break;
                }
                page += 1;
            }

            ()
        };

        g.into_async_iter()
    }

    /// Sends one request and turns the reply into an [`ApiResponse`].
    /// A failed step aborts the call; nothing is retried.
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        payload: Option<Payload>,
    ) -> Result<ApiResponse, Error> {
        let request = HttpRequest {
            method: endpoint.method,
            url: endpoint.url.clone(),
            auth_token: self.config.auth_token.clone(),
            body: payload.map(Payload::into_bytes),
        };

        let resp = self.http.execute(request).await.map_err(|e| {
            error!(%endpoint, error = %e, "request to Campaign Monitor failed");
            Error::from(e)
        })?;

        debug!(
            %endpoint,
            status = resp.status,
            body = %String::from_utf8_lossy(&resp.body),
            "response received"
        );

        if resp.is_error() {
            let body: Value = serde_json::from_slice(&resp.body).map_err(|e| {
                error!(%endpoint, status = resp.status, error = %e, "malformed error response");
                Error::ResponseParse(e)
            })?;
            return Err(match serde_json::from_value::<CampaignMonitorError>(body.clone()) {
                Ok(error) => {
                    error!(%endpoint, status = resp.status, error = %error, "Campaign Monitor rejected the request");
                    Error::CampaignMonitor {
                        status: resp.status,
                        error,
                    }
                }
                Err(_) => {
                    error!(%endpoint, status = resp.status, %body, "request rejected");
                    Error::Api {
                        status: resp.status,
                        body,
                    }
                }
            });
        }

        // Subscriber updates answer with an empty body.
        if endpoint.method == Method::Put && resp.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiResponse::new(Value::Null));
        }

        let value: Value = serde_json::from_slice(&resp.body).map_err(|e| {
            error!(%endpoint, error = %e, "malformed JSON response");
            Error::ResponseParse(e)
        })?;

        Ok(ApiResponse::new(value))
    }
}
