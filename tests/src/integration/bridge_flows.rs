//! # Bridge Flows
//!
//! Provider, relay and background host running together, connected only by
//! the page bus and the privileged channel.
//!
//! ## Flows Tested:
//!
//! 1. **Request/response**: every signing call round-trips through all three contexts
//! 2. **Pushes**: wallet account switches and locks reach page listeners
//! 3. **Timeouts**: a wallet that never answers still settles every call
//! 4. **Races**: a disconnect during a consent prompt wins over the late approval
//! 5. **Isolation**: other windows and stale responses change nothing

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use shared_bus::MessagePoster;
    use shared_types::{
        BridgeError, Origin, RequestKind, SendOptions, SessionFlags, StorageChange, WireRequest,
        WireResponse, ADDRESS_FLAG_KEY,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Instant};
    use wallet_runtime::{
        BridgeConfig, CoreSignature, DevWalletCore, WalletBridge, WalletConfig, WalletCore,
    };
    use wb_01_provider::{
        ConnectOptions, ConnectionState, EventKind, Provider, ProviderEvent, RawTransaction,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const PAGE: &str = "https://dapp.example";

    fn config(authenticated: bool, allowed: &[&str]) -> BridgeConfig {
        BridgeConfig {
            wallet: WalletConfig {
                address: "dev1".into(),
                authenticated,
                allowed_sites: allowed.iter().map(|s| s.to_string()).collect(),
                auto_approve: true,
            },
            ..BridgeConfig::default()
        }
    }

    /// Collect events of one kind.
    fn record(provider: &Provider, kind: EventKind) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        provider.on(kind, move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ProviderEvent>) -> ProviderEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5 s")
            .expect("event channel closed")
    }

    async fn connected(config: &BridgeConfig) -> (WalletBridge, Provider) {
        let bridge = WalletBridge::start(config).unwrap();
        let provider = bridge.attach_provider().unwrap();
        provider.connect(ConnectOptions::default()).await.unwrap();
        (bridge, provider)
    }

    /// Wallet whose consent prompt and disconnect never return.
    struct HangingCore {
        inner: DevWalletCore,
    }

    #[async_trait]
    impl WalletCore for HangingCore {
        fn session_flags(&self) -> SessionFlags {
            self.inner.session_flags()
        }

        async fn approve_connection(&self, _origin: &Origin) -> Result<String, String> {
            std::future::pending().await
        }

        async fn disconnect(&self, _origin: &Origin) {
            std::future::pending::<()>().await
        }

        async fn sign_transaction(&self, origin: &Origin, tx: &[u8]) -> Result<Vec<u8>, String> {
            self.inner.sign_transaction(origin, tx).await
        }

        async fn sign_message(
            &self,
            origin: &Origin,
            message: &[u8],
        ) -> Result<CoreSignature, String> {
            self.inner.sign_message(origin, message).await
        }

        async fn sign_and_send(
            &self,
            origin: &Origin,
            tx: &[u8],
            options: &SendOptions,
        ) -> Result<String, String> {
            self.inner.sign_and_send(origin, tx, options).await
        }
    }

    fn hanging_bridge(config: &BridgeConfig) -> WalletBridge<HangingCore> {
        let inner = DevWalletCore::new(&config.wallet).unwrap();
        let changes = inner.changes();
        WalletBridge::with_core(config, Arc::new(HangingCore { inner }), changes).unwrap()
    }

    /// Wallet whose user takes five seconds to approve a site.
    struct SlowApprovalCore {
        inner: DevWalletCore,
    }

    #[async_trait]
    impl WalletCore for SlowApprovalCore {
        fn session_flags(&self) -> SessionFlags {
            self.inner.session_flags()
        }

        async fn approve_connection(&self, origin: &Origin) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.inner.approve_connection(origin).await
        }

        async fn disconnect(&self, origin: &Origin) {
            self.inner.disconnect(origin).await
        }

        async fn sign_transaction(&self, origin: &Origin, tx: &[u8]) -> Result<Vec<u8>, String> {
            self.inner.sign_transaction(origin, tx).await
        }

        async fn sign_message(
            &self,
            origin: &Origin,
            message: &[u8],
        ) -> Result<CoreSignature, String> {
            self.inner.sign_message(origin, message).await
        }

        async fn sign_and_send(
            &self,
            origin: &Origin,
            tx: &[u8],
            options: &SendOptions,
        ) -> Result<String, String> {
            self.inner.sign_and_send(origin, tx, options).await
        }
    }

    fn slow_approval_bridge(config: &BridgeConfig) -> WalletBridge<SlowApprovalCore> {
        let inner = DevWalletCore::new(&config.wallet).unwrap();
        let changes = inner.changes();
        WalletBridge::with_core(config, Arc::new(SlowApprovalCore { inner }), changes).unwrap()
    }

    // =========================================================================
    // REQUEST / RESPONSE
    // =========================================================================

    #[tokio::test]
    async fn test_full_session() {
        let (bridge, provider) = connected(&config(false, &[])).await;
        assert_eq!(provider.public_key().as_deref(), Some("dev1"));
        assert!(bridge.relay().is_page_connected());

        let signed = provider
            .sign_transaction(&RawTransaction::new(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(&signed.as_bytes()[..3], &[1, 2, 3]);
        assert_eq!(signed.as_bytes().len(), 3 + 32);

        let all = provider
            .sign_all_transactions(&[RawTransaction::new(vec![1]), RawTransaction::new(vec![2])])
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].as_bytes()[0], 2);

        let message = provider.sign_message(b"hello").await.unwrap();
        assert_eq!(message.address, "dev1");
        assert_eq!(message.signature.len(), 32);

        let sent = provider
            .sign_and_send_transaction(
                &RawTransaction::new(vec![9]),
                Some(SendOptions {
                    skip_preflight: true,
                    ..SendOptions::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(sent.signature.len(), 64);

        provider.disconnect().await;
        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert!(!bridge.relay().is_page_connected());
        assert!(!bridge
            .wallet()
            .session_flags()
            .allowed_sites
            .contains(&Origin::parse(PAGE).unwrap()));

        assert_eq!(
            provider.sign_message(b"again").await,
            Err(BridgeError::NotConnected)
        );
        assert_eq!(provider.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_wallet_denial_reaches_page() {
        let (bridge, provider) = connected(&config(false, &[])).await;

        // The wallet forgets the site behind the page's back
        bridge
            .wallet()
            .disconnect(&Origin::parse(PAGE).unwrap())
            .await;

        let err = provider.sign_message(b"hi").await.unwrap_err();
        assert!(matches!(err, BridgeError::Rejected(_)), "{err:?}");
        assert!(provider.is_connected());
    }

    // =========================================================================
    // PUSHES
    // =========================================================================

    #[tokio::test]
    async fn test_account_switch_reaches_page() {
        let (bridge, provider) = connected(&config(true, &[PAGE])).await;
        let mut events = record(&provider, EventKind::AccountChanged);

        bridge.wallet().switch_account("dev2");

        assert_eq!(
            next_event(&mut events).await,
            ProviderEvent::AccountChanged {
                address: "dev2".into()
            }
        );
        assert_eq!(provider.public_key().as_deref(), Some("dev2"));
    }

    #[tokio::test]
    async fn test_identical_account_pushes_fire_once() {
        let (bridge, provider) = connected(&config(true, &[PAGE])).await;
        let mut events = record(&provider, EventKind::AccountChanged);

        let changes = bridge.wallet().changes();
        for address in ["dev2", "dev2", "dev3"] {
            changes
                .send(StorageChange::single(
                    ADDRESS_FLAG_KEY,
                    None,
                    Some(json!(address)),
                ))
                .unwrap();
        }

        // Pushes are delivered in order, so seeing dev3 means both dev2 were handled
        let mut seen = Vec::new();
        loop {
            match next_event(&mut events).await {
                ProviderEvent::AccountChanged { address } => {
                    let last = address == "dev3";
                    seen.push(address);
                    if last {
                        break;
                    }
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(seen, vec!["dev2".to_string(), "dev3".to_string()]);
    }

    #[tokio::test]
    async fn test_wallet_lock_disconnects_page() {
        let (bridge, provider) = connected(&config(true, &[PAGE])).await;
        let mut events = record(&provider, EventKind::Disconnect);

        bridge.wallet().lock();

        assert_eq!(next_event(&mut events).await, ProviderEvent::Disconnect);
        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert!(!bridge.relay().is_page_connected());
        assert_eq!(
            provider.sign_message(b"hi").await,
            Err(BridgeError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_no_pushes_before_connect() {
        let bridge = WalletBridge::start(&config(true, &[PAGE])).unwrap();
        let provider = bridge.attach_provider().unwrap();
        let mut events = record(&provider, EventKind::AccountChanged);

        bridge.wallet().switch_account("dev2");
        provider.connect(ConnectOptions::default()).await.unwrap();
        bridge.wallet().switch_account("dev3");

        assert_eq!(
            next_event(&mut events).await,
            ProviderEvent::AccountChanged {
                address: "dev3".into()
            }
        );
    }

    // =========================================================================
    // TIMEOUTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_hung_approval_times_out_at_relay() {
        let config = config(false, &[]);
        let bridge = hanging_bridge(&config);
        let provider = bridge.attach_provider().unwrap();

        let started = Instant::now();
        let err = provider
            .connect(ConnectOptions::default())
            .await
            .unwrap_err();

        // Default settings: the relay's answer beats the page's own timer
        match &err {
            BridgeError::Timeout(message) => assert!(message.contains("wallet"), "{message}"),
            other => panic!("expected a relay timeout, got {other:?}"),
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= config.relay.background_timeout());
        assert!(elapsed < config.provider.request_timeout());
        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert_eq!(provider.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_settles_when_wallet_hangs() {
        let bridge = hanging_bridge(&config(true, &[PAGE]));
        let provider = bridge.attach_provider().unwrap();
        provider.connect(ConnectOptions::default()).await.unwrap();
        let mut events = record(&provider, EventKind::Disconnect);

        provider.disconnect().await;

        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert_eq!(events.try_recv().unwrap(), ProviderEvent::Disconnect);
        assert!(events.try_recv().is_err());
        assert!(!bridge.relay().is_page_connected());
        assert_eq!(provider.pending_requests(), 0);
    }

    // =========================================================================
    // RACES
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_approval_stays_disconnected() {
        let bridge = slow_approval_bridge(&config(false, &[]));
        let provider = bridge.attach_provider().unwrap();
        let page = Origin::parse(PAGE).unwrap();

        let (connect, ()) = tokio::join!(provider.connect(ConnectOptions::default()), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            provider.disconnect().await;
        });

        let err = connect.unwrap_err();
        assert!(matches!(err, BridgeError::Rejected(_)), "{err:?}");
        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert!(!bridge.relay().is_page_connected());
        assert!(!bridge.wallet().session_flags().allowed_sites.contains(&page));

        // An account switch must not reach the page
        let mut bus = bridge.window().subscribe();
        bridge.wallet().inner.switch_account("dev2");
        tokio::time::sleep(Duration::from_secs(1)).await;
        let pushed: Vec<_> = bus
            .drain()
            .into_iter()
            .filter(|m| m.message_type() == Some("ACCOUNT_CHANGED"))
            .collect();
        assert!(pushed.is_empty(), "{pushed:?}");

        // A fresh connect works and receives pushes again
        let mut events = record(&provider, EventKind::AccountChanged);
        provider.connect(ConnectOptions::default()).await.unwrap();
        assert!(bridge.relay().is_page_connected());
        bridge.wallet().inner.switch_account("dev3");
        assert_eq!(
            next_event(&mut events).await,
            ProviderEvent::AccountChanged {
                address: "dev3".into()
            }
        );
    }

    // =========================================================================
    // ISOLATION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_other_window_gets_no_answer() {
        let bridge = WalletBridge::start(&config(true, &[PAGE])).unwrap();
        let frame = bridge.open_window(Origin::parse("https://evil.example").unwrap());
        let intruder = Provider::attach(frame, Default::default()).unwrap();

        let err = intruder
            .connect(ConnectOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout(_)), "{err:?}");
        assert!(!bridge.relay().is_page_connected());
    }

    #[tokio::test]
    async fn test_stale_response_is_dropped() {
        let bridge = WalletBridge::start(&config(true, &[PAGE])).unwrap();
        let mut bus = bridge.window().subscribe();
        let provider = bridge.attach_provider().unwrap();
        provider.connect(ConnectOptions::default()).await.unwrap();
        provider.sign_message(b"first").await.unwrap();

        let settled = bus
            .drain()
            .into_iter()
            .filter_map(|m| serde_json::from_value::<WireRequest>(m.data).ok())
            .find(|r| r.request_kind() == Some(RequestKind::SignMessage))
            .map(|r| r.correlation_id)
            .expect("sign request on the bus");

        // Replay a forged answer for the settled id from the page itself
        let forged = WireResponse::success(
            RequestKind::SignMessage,
            settled,
            json!({ "signature": "00", "address": "evil" }),
        );
        bridge
            .window()
            .post_message(serde_json::to_value(forged).unwrap())
            .unwrap();

        let second = provider.sign_message(b"second").await.unwrap();
        assert_eq!(second.address, "dev1");

        let stats = provider.pending_stats();
        assert_eq!(stats.registered.load(Ordering::Relaxed), 3);
        assert_eq!(stats.completed.load(Ordering::Relaxed), 3);
        assert_eq!(provider.pending_requests(), 0);
    }
}
