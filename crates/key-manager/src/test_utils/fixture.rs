use std::rc::Rc;

use alloy_primitives::{address, Address, Bytes, B256, U256};

use super::{ManualClock, MemoryAccount, TestChain, TestContract, TestSigner};
use crate::{
    relay::ValidityWindow, AccountCall, AllowedCall, AllowedDataKeys, DataEntry, Erc725Account,
    ExecutionRequest, KeyManager, KeyManagerConfig, KeyManagerError, PermissionStore,
    PermissionUpdate, Permissions,
};

/// Address of the key manager under test.
pub const KEY_MANAGER: Address = address!("00000000000000000000000000000000006b6d01");
/// Address of the account it owns.
pub const ACCOUNT: Address = address!("0000000000000000000000000000000000ac0001");
/// The controller holding [`Permissions::ALL`] from the start.
pub const OWNER: Address = address!("00000000000000000000000000000000000e0001");
/// The initial reading of the fixture clock.
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
/// The initial balance of the account.
pub const INITIAL_BALANCE: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

/// The key manager the fixture builds.
pub type TestKeyManager = KeyManager<Rc<MemoryAccount>, Rc<ManualClock>>;

/// A key manager owning a funded account, with [`OWNER`] holding [`Permissions::ALL`].
///
/// The key manager is registered on the chain at [`KEY_MANAGER`], so contracts can call back
/// into it.
#[derive(Debug, derive_more::Deref)]
pub struct Lsp6Fixture {
    /// The key manager.
    #[deref]
    pub key_manager: Rc<TestKeyManager>,
    /// The account owned by the key manager.
    pub account: Rc<MemoryAccount>,
    /// The chain.
    pub chain: Rc<TestChain>,
    /// The clock read by the key manager.
    pub clock: Rc<ManualClock>,
}

impl Default for Lsp6Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Lsp6Fixture {
    /// Creates a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(KeyManagerConfig::default())
    }

    /// Creates a fixture with `config`.
    pub fn with_config(config: KeyManagerConfig) -> Self {
        let chain = Rc::new(TestChain::new());
        let account = Rc::new(MemoryAccount::new(ACCOUNT, KEY_MANAGER, Rc::clone(&chain)));
        let clock = Rc::new(ManualClock::new(GENESIS_TIMESTAMP));
        let key_manager = Rc::new(
            KeyManager::new(KEY_MANAGER, Rc::clone(&account))
                .with_config(config)
                .with_clock(Rc::clone(&clock)),
        );
        chain.register(KEY_MANAGER, Rc::downgrade(&key_manager));
        chain.set_balance(ACCOUNT, INITIAL_BALANCE);

        let fixture = Self { key_manager, account, chain, clock };
        fixture.seed_permissions(OWNER, Permissions::ALL);
        fixture
    }

    /// Writes permission data straight into the account, bypassing authorization.
    pub fn seed(
        &self,
        change: impl FnOnce(PermissionUpdate<'_, Rc<MemoryAccount>>) -> PermissionUpdate<'_, Rc<MemoryAccount>>,
    ) {
        let entries = change(PermissionStore::new(&self.account).update()).into_entries();
        self.account.set_data_batch(KEY_MANAGER, &entries).expect("the key manager owns the account");
    }

    /// Seeds the bitmask of `controller`.
    pub fn seed_permissions(&self, controller: Address, permissions: Permissions) {
        self.seed(|update| update.set_permissions(controller, permissions));
    }

    /// Seeds the allowed calls of `controller`.
    pub fn seed_allowed_calls(&self, controller: Address, calls: &[AllowedCall]) {
        self.seed(|update| update.set_allowed_calls(controller, calls));
    }

    /// Seeds the allowed data keys of `controller`.
    pub fn seed_allowed_data_keys(&self, controller: Address, keys: &AllowedDataKeys) {
        self.seed(|update| update.set_allowed_data_keys(controller, keys));
    }

    /// The bitmask currently stored for `controller`.
    pub fn permissions_of(&self, controller: Address) -> Permissions {
        PermissionStore::new(&self.account).permissions_of(controller)
    }

    /// Reads a data key of the account.
    pub fn data(&self, key: B256) -> Bytes {
        self.account.get_data(key)
    }

    /// The balance of `address`.
    pub fn balance(&self, address: Address) -> U256 {
        self.chain.balance(address)
    }

    /// Places `contract` at `address`.
    pub fn register(&self, address: Address, contract: impl TestContract + 'static) {
        self.chain.register(address, contract);
    }

    /// Signs `payload` with the next nonce of `signer` on `channel` and submits it as a relay
    /// call.
    pub fn relay(
        &self,
        signer: &TestSigner,
        channel: u128,
        validity: ValidityWindow,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        let nonce = self.get_nonce(signer.address(), channel);
        let signature = signer.sign_relay_call(
            KEY_MANAGER,
            self.config().chain_id,
            nonce,
            validity.packed(),
            payload,
        );
        self.execute_relay_call(&signature, nonce, validity.packed(), payload)
    }
}

/// A payload executing a single request.
pub fn execute_payload(request: ExecutionRequest) -> Bytes {
    AccountCall::Execute(vec![request]).encode()
}

/// A payload sending `value` from the account to `to`.
pub fn transfer_payload(to: Address, value: U256) -> Bytes {
    execute_payload(ExecutionRequest::call(to, value, Bytes::new()))
}

/// A payload writing a single data key.
pub fn set_data_payload(key: B256, value: impl Into<Bytes>) -> Bytes {
    AccountCall::SetData(vec![DataEntry::new(key, value)]).encode()
}
