//! # Connect Policy
//!
//! How a page `connect()` turns into wallet traffic, counted at the wallet:
//!
//! | session | site | approval prompts |
//! |---|---|---|
//! | authenticated | allowlisted | 0 |
//! | authenticated | not allowlisted | 1 |
//! | locked | any | 1 |

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use shared_types::{BridgeError, Origin, SendOptions, SessionFlags};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wallet_runtime::{
        BridgeConfig, CoreSignature, DevWalletCore, WalletBridge, WalletConfig, WalletCore,
    };
    use wb_01_provider::{ConnectOptions, ConnectionState, Provider};

    const PAGE: &str = "https://dapp.example";

    /// Development wallet that counts consent prompts and flag reads.
    struct CountingCore {
        inner: DevWalletCore,
        approvals: AtomicUsize,
        flag_reads: AtomicUsize,
    }

    impl CountingCore {
        fn approvals(&self) -> usize {
            self.approvals.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WalletCore for CountingCore {
        fn session_flags(&self) -> SessionFlags {
            self.flag_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.session_flags()
        }

        async fn approve_connection(&self, origin: &Origin) -> Result<String, String> {
            self.approvals.fetch_add(1, Ordering::SeqCst);
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

    fn start_bridge(
        authenticated: bool,
        allowed: &[&str],
        auto_approve: bool,
    ) -> (WalletBridge<CountingCore>, Provider) {
        let config = BridgeConfig {
            wallet: WalletConfig {
                address: "dev1".into(),
                authenticated,
                allowed_sites: allowed.iter().map(|s| s.to_string()).collect(),
                auto_approve,
            },
            ..BridgeConfig::default()
        };
        let inner = DevWalletCore::new(&config.wallet).unwrap();
        let changes = inner.changes();
        let core = Arc::new(CountingCore {
            inner,
            approvals: AtomicUsize::new(0),
            flag_reads: AtomicUsize::new(0),
        });
        let bridge = WalletBridge::with_core(&config, core, changes).unwrap();
        let provider = bridge.attach_provider().unwrap();
        (bridge, provider)
    }

    #[tokio::test]
    async fn test_trusted_site_connects_without_prompt() {
        let (bridge, provider) = start_bridge(true, &[PAGE], false);

        let result = provider.connect(ConnectOptions::default()).await.unwrap();

        assert_eq!(result.address, "dev1");
        assert_eq!(bridge.wallet().approvals(), 0);
        assert!(bridge.relay().is_page_connected());
    }

    #[tokio::test]
    async fn test_unlisted_site_prompts_once() {
        let (bridge, provider) = start_bridge(true, &[], true);

        let result = provider.connect(ConnectOptions::default()).await.unwrap();

        assert_eq!(result.address, "dev1");
        assert_eq!(bridge.wallet().approvals(), 1);
        assert!(bridge
            .wallet()
            .session_flags()
            .allowed_sites
            .contains(&Origin::parse(PAGE).unwrap()));
    }

    #[tokio::test]
    async fn test_locked_wallet_prompts_once_even_when_listed() {
        let (bridge, provider) = start_bridge(false, &[PAGE], true);

        provider.connect(ConnectOptions::default()).await.unwrap();

        assert_eq!(bridge.wallet().approvals(), 1);
        assert!(bridge.wallet().session_flags().authenticated);
    }

    #[tokio::test]
    async fn test_only_if_trusted_never_prompts() {
        let (bridge, provider) = start_bridge(true, &[], true);

        let err = provider
            .connect(ConnectOptions {
                only_if_trusted: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Rejected(_)), "{err:?}");
        assert_eq!(bridge.wallet().approvals(), 0);
        assert_eq!(provider.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_declined_prompt_leaves_page_disconnected() {
        let (bridge, provider) = start_bridge(false, &[], false);

        let err = provider
            .connect(ConnectOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Rejected(_)), "{err:?}");
        assert_eq!(bridge.wallet().approvals(), 1);
        assert_eq!(provider.state(), ConnectionState::Disconnected);
        assert!(!bridge.relay().is_page_connected());
    }

    #[tokio::test]
    async fn test_connected_page_sends_nothing() {
        let (bridge, provider) = start_bridge(true, &[], true);
        provider.connect(ConnectOptions::default()).await.unwrap();
        let reads = bridge.wallet().flag_reads.load(Ordering::SeqCst);

        let again = provider.connect(ConnectOptions::default()).await.unwrap();

        assert_eq!(again.address, "dev1");
        assert_eq!(bridge.wallet().approvals(), 1);
        assert_eq!(bridge.wallet().flag_reads.load(Ordering::SeqCst), reads);
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_prompts_again() {
        let (bridge, provider) = start_bridge(true, &[], true);
        provider.connect(ConnectOptions::default()).await.unwrap();
        provider.disconnect().await;

        provider.connect(ConnectOptions::default()).await.unwrap();

        assert_eq!(bridge.wallet().approvals(), 2);
        assert!(provider.is_connected());
    }

    #[tokio::test]
    async fn test_concurrent_connect_is_rejected_locally() {
        let (bridge, provider) = start_bridge(true, &[], true);

        let (first, second) = tokio::join!(
            provider.connect(ConnectOptions::default()),
            provider.connect(ConnectOptions::default())
        );

        assert!(first.is_ok());
        assert_eq!(second, Err(BridgeError::AlreadyPending));
        assert_eq!(bridge.wallet().approvals(), 1);
    }
}
