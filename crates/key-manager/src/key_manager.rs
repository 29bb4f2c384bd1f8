//! The key manager: authorizes payloads from controllers and forwards them to the account it
//! owns.

use std::cell::RefCell;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use once_cell::unsync::OnceCell;
use tracing::{debug, info, trace};

use crate::{
    abi::ILSP6KeyManager,
    constants::erc1271::{FAIL_VALUE, MAGIC_VALUE},
    data_keys::{classify_data_key, DataKeyKind},
    relay::{recover_signer, relay_call_digest, ValidityWindow},
    request::encode_batch_outputs,
    AccountCall, AccountError, AllowedCall, AllowedDataKeys, Authorizer, Clock, Denial,
    Erc725Account, KeyManagerConfig, KeyManagerError, KeyManagerEvent, NonceLedger,
    PermissionStore, PermissionUpdate, Permissions, ReentrancyGuard, ReentrancyPolicy,
    RelayNonce, SystemClock,
};

/// A permission-gated gateway owning an ERC725 account.
///
/// Every entry point takes `&self`: a forwarded call may run arbitrary contract code that calls
/// back into the same key manager, which is exactly what the reentrancy guard is there to catch.
///
/// A key manager is created in one of three states:
///
/// - [`KeyManager::new`]: bound to its account.
/// - [`KeyManager::uninitialized`]: a proxy-style instance that is bound by the first
///   [`KeyManager::initialize`].
/// - [`KeyManager::base`]: a shared base implementation whose initializer is locked for good,
///   so nobody can take it over.
#[derive(Debug)]
pub struct KeyManager<A, C = SystemClock> {
    address: Address,
    account: OnceCell<A>,
    initializer_locked: bool,
    config: KeyManagerConfig,
    clock: C,
    nonces: NonceLedger,
    guard: ReentrancyGuard,
    events: RefCell<Vec<KeyManagerEvent>>,
}

impl<A> KeyManager<A> {
    /// Creates a key manager at `address`, bound to `account`.
    pub fn new(address: Address, account: A) -> Self {
        Self::with_account_cell(address, OnceCell::with_value(account), false)
    }

    /// Creates a key manager that waits for [`KeyManager::initialize`].
    pub fn uninitialized(address: Address) -> Self {
        Self::with_account_cell(address, OnceCell::new(), false)
    }

    /// Creates a base implementation that can never be initialized.
    pub fn base(address: Address) -> Self {
        Self::with_account_cell(address, OnceCell::new(), true)
    }

    fn with_account_cell(address: Address, account: OnceCell<A>, initializer_locked: bool) -> Self {
        Self {
            address,
            account,
            initializer_locked,
            config: KeyManagerConfig::default(),
            clock: SystemClock,
            nonces: NonceLedger::new(),
            guard: ReentrancyGuard::new(),
            events: RefCell::new(Vec::new()),
        }
    }
}

impl<A, C> KeyManager<A, C> {
    /// Sets the configuration.
    pub fn with_config(mut self, config: KeyManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the clock used to check relay call validity windows.
    pub fn with_clock<C2>(self, clock: C2) -> KeyManager<A, C2> {
        KeyManager {
            address: self.address,
            account: self.account,
            initializer_locked: self.initializer_locked,
            config: self.config,
            clock,
            nonces: self.nonces,
            guard: self.guard,
            events: self.events,
        }
    }

    /// The address of the key manager.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The configuration.
    pub const fn config(&self) -> &KeyManagerConfig {
        &self.config
    }

    /// Drains the events emitted so far.
    pub fn take_events(&self) -> Vec<KeyManagerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// The next relay nonce of `signer` on `channel`, packed as `channel << 128 | sequence`.
    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        self.nonces.next(signer, channel).packed()
    }

    fn emit(&self, event: KeyManagerEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl<A: Erc725Account, C: Clock> KeyManager<A, C> {
    /// Binds the key manager to `account`.
    ///
    /// Succeeds once. Fails with [`KeyManagerError::AlreadyInitialized`] on a bound instance and
    /// on a base implementation.
    pub fn initialize(&self, account: A) -> Result<(), KeyManagerError> {
        if self.initializer_locked {
            debug!(key_manager = %self.address, "Initialization of base implementation rejected");
            return Err(KeyManagerError::AlreadyInitialized);
        }
        let target = account.address();
        self.account.set(account).map_err(|_| KeyManagerError::AlreadyInitialized)?;
        info!(key_manager = %self.address, account = %target, "Key manager initialized");
        Ok(())
    }

    /// The account this key manager owns.
    pub fn account(&self) -> Result<&A, KeyManagerError> {
        self.account.get().ok_or(KeyManagerError::NotInitialized)
    }

    /// The address of the account this key manager owns.
    pub fn target(&self) -> Result<Address, KeyManagerError> {
        Ok(self.account()?.address())
    }

    /// A read view over the permissions stored in the account.
    pub fn permission_store(&self) -> Result<PermissionStore<'_, A>, KeyManagerError> {
        Ok(PermissionStore::new(self.account()?))
    }

    /// Authorizes `payload` for `caller` and forwards it to the account.
    ///
    /// On failure nothing is forwarded and no event is kept.
    pub fn execute(&self, caller: Address, payload: &[u8]) -> Result<Bytes, KeyManagerError> {
        let checkpoint = self.events.borrow().len();
        let result = self.account().and_then(|account| self.execute_payload(account, caller, payload));
        if let Err(error) = &result {
            self.events.borrow_mut().truncate(checkpoint);
            debug!(caller = %caller, %error, "Payload rejected");
        }
        result
    }

    fn execute_payload(
        &self,
        account: &A,
        caller: Address,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        let call = AccountCall::decode(payload)?;
        Authorizer::new(account).authorize(caller, &call)?;

        let _lock = self.guard.enter(self.reentry_allowed(account, caller))?;
        let output = self.forward(account, &call)?;

        let selector = FixedBytes::from_slice(&payload[..4]);
        trace!(caller = %caller, %selector, output_len = output.len(), "Payload executed");
        self.emit(KeyManagerEvent::Executed {
            caller,
            selector,
            success: true,
            return_data: output.clone(),
        });
        Ok(output)
    }

    fn reentry_allowed(&self, account: &A, caller: Address) -> bool {
        match self.config.reentrancy {
            ReentrancyPolicy::Forbid => false,
            ReentrancyPolicy::PermissionGated => {
                PermissionStore::new(account).permissions_of(caller).contains(Permissions::REENTRANCY)
            }
        }
    }

    fn forward(&self, account: &A, call: &AccountCall) -> Result<Bytes, KeyManagerError> {
        let owner = self.address;
        match call {
            AccountCall::SetData(entries) => {
                match entries.as_slice() {
                    [entry] => account.set_data(owner, entry.key, entry.value.clone()),
                    entries => account.set_data_batch(owner, entries),
                }
                .map_err(bubble)?;
                for entry in entries {
                    if let DataKeyKind::Permissions(controller) = classify_data_key(entry.key) {
                        let permissions = Permissions::from_word(&entry.value);
                        info!(controller = %controller, ?permissions, "Permissions set");
                        self.emit(KeyManagerEvent::PermissionsSet { controller, permissions });
                    }
                }
                Ok(Bytes::new())
            }
            AccountCall::Execute(requests) => match requests.as_slice() {
                [request] => account
                    .execute(owner, request.operation, request.target, request.value, request.data.clone())
                    .map_err(bubble),
                requests => {
                    let mut outputs = Vec::with_capacity(requests.len());
                    for request in requests {
                        outputs.push(
                            account
                                .execute(
                                    owner,
                                    request.operation,
                                    request.target,
                                    request.value,
                                    request.data.clone(),
                                )
                                .map_err(bubble)?,
                        );
                    }
                    Ok(encode_batch_outputs(outputs))
                }
            },
            AccountCall::TransferOwnership(new_owner) => {
                account.transfer_ownership(owner, *new_owner).map_err(bubble)?;
                info!(account = %account.address(), new_owner = %new_owner, "Ownership transferred");
                Ok(Bytes::new())
            }
            AccountCall::RenounceOwnership => {
                account.renounce_ownership(owner).map_err(bubble)?;
                info!(account = %account.address(), "Ownership renounced");
                Ok(Bytes::new())
            }
        }
    }

    /// Executes `payload` on behalf of the signer of `signature`.
    ///
    /// The signer must use the next nonce of its channel and submit within the validity window.
    /// The payload is then authorized exactly as if the signer had called [`Self::execute`].
    /// If it fails, the nonce is given back.
    pub fn execute_relay_call(
        &self,
        signature: &[u8],
        nonce: U256,
        validity: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        self.relay(signature, nonce, validity, payload).inspect_err(|error| {
            debug!(%nonce, %error, "Relay call rejected");
        })
    }

    fn relay(
        &self,
        signature: &[u8],
        nonce: U256,
        validity: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        let account = self.account()?;
        let digest =
            relay_call_digest(self.address, self.config.chain_id, nonce, validity, U256::ZERO, payload);
        let signer = recover_signer(digest, signature)?;

        let relay_nonce = RelayNonce::from(nonce);
        let invalid_nonce = || KeyManagerError::InvalidRelayNonce {
            signer,
            nonce,
            signature: Bytes::copy_from_slice(signature),
        };
        if !self.nonces.is_valid(signer, relay_nonce) {
            return Err(invalid_nonce());
        }
        ValidityWindow::unpack(validity).check(self.clock.now())?;

        if self.config.relay_requires_permission {
            let permissions = PermissionStore::new(account).permissions_of(signer);
            if permissions.is_empty() {
                return Err(Denial::NoPermissionsSet { controller: signer }.into());
            }
            if !permissions.contains(Permissions::EXECUTE_RELAY_CALL) {
                return Err(Denial::NotAuthorised {
                    controller: signer,
                    permission: Permissions::EXECUTE_RELAY_CALL,
                }
                .into());
            }
        }

        self.nonces.consume(signer, relay_nonce).map_err(|_| invalid_nonce())?;
        let result = self.execute(signer, payload);
        if result.is_err() {
            self.nonces.restore(signer, relay_nonce);
        }
        result
    }

    /// ERC1271: returns the magic value if `signature` over `hash` was made by a controller
    /// holding `SIGN`, and `0xffffffff` otherwise.
    pub fn is_valid_signature(
        &self,
        hash: B256,
        signature: &[u8],
    ) -> Result<FixedBytes<4>, KeyManagerError> {
        let store = self.permission_store()?;
        let valid = recover_signer(hash, signature)
            .is_ok_and(|signer| store.permissions_of(signer).contains(Permissions::SIGN));
        Ok(if valid { MAGIC_VALUE } else { FAIL_VALUE })
    }

    /// Routes ABI-encoded calldata for [`ILSP6KeyManager`] sent by `caller`.
    ///
    /// Returns the ABI-encoded return value.
    pub fn dispatch(&self, caller: Address, calldata: &[u8]) -> Result<Bytes, KeyManagerError> {
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|selector| selector.try_into().ok())
            .ok_or(KeyManagerError::InvalidPayload)?;

        let output = match selector {
            ILSP6KeyManager::executeCall::SELECTOR => {
                let call = decode_call::<ILSP6KeyManager::executeCall>(calldata)?;
                let result = self.execute(caller, &call.payload)?;
                ILSP6KeyManager::executeCall::abi_encode_returns(&(result,))
            }
            ILSP6KeyManager::executeRelayCallCall::SELECTOR => {
                let call = decode_call::<ILSP6KeyManager::executeRelayCallCall>(calldata)?;
                let result = self.execute_relay_call(
                    &call.signature,
                    call.nonce,
                    call.validityTimestamps,
                    &call.payload,
                )?;
                ILSP6KeyManager::executeRelayCallCall::abi_encode_returns(&(result,))
            }
            ILSP6KeyManager::getNonceCall::SELECTOR => {
                let call = decode_call::<ILSP6KeyManager::getNonceCall>(calldata)?;
                let nonce = self.get_nonce(call.from, call.channelId);
                ILSP6KeyManager::getNonceCall::abi_encode_returns(&(nonce,))
            }
            ILSP6KeyManager::isValidSignatureCall::SELECTOR => {
                let call = decode_call::<ILSP6KeyManager::isValidSignatureCall>(calldata)?;
                let magic = self.is_valid_signature(call.dataHash, &call.signature)?;
                ILSP6KeyManager::isValidSignatureCall::abi_encode_returns(&(magic,))
            }
            ILSP6KeyManager::targetCall::SELECTOR => {
                let target = self.target()?;
                ILSP6KeyManager::targetCall::abi_encode_returns(&(target,))
            }
            _ => return Err(KeyManagerError::UnknownSelector(selector.into())),
        };
        Ok(output.into())
    }

    /// Adds `permissions` to `controller` on behalf of `caller`.
    pub fn grant(
        &self,
        caller: Address,
        controller: Address,
        permissions: Permissions,
    ) -> Result<(), KeyManagerError> {
        self.update_permissions(caller, |update| update.grant(controller, permissions))
    }

    /// Replaces the permissions of `controller` on behalf of `caller`.
    pub fn set_permissions(
        &self,
        caller: Address,
        controller: Address,
        permissions: Permissions,
    ) -> Result<(), KeyManagerError> {
        self.update_permissions(caller, |update| update.set_permissions(controller, permissions))
    }

    /// Removes `controller` on behalf of `caller`.
    pub fn revoke(&self, caller: Address, controller: Address) -> Result<(), KeyManagerError> {
        self.update_permissions(caller, |update| update.revoke(controller))
    }

    /// Replaces the allowed calls of `controller` on behalf of `caller`.
    pub fn set_allowed_calls(
        &self,
        caller: Address,
        controller: Address,
        calls: &[AllowedCall],
    ) -> Result<(), KeyManagerError> {
        self.update_permissions(caller, |update| update.set_allowed_calls(controller, calls))
    }

    /// Replaces the allowed data keys of `controller` on behalf of `caller`.
    pub fn set_allowed_data_keys(
        &self,
        caller: Address,
        controller: Address,
        keys: &AllowedDataKeys,
    ) -> Result<(), KeyManagerError> {
        self.update_permissions(caller, |update| update.set_allowed_data_keys(controller, keys))
    }

    /// Sends the writes of a [`PermissionUpdate`] through [`Self::execute`], so they are
    /// authorized like any other payload.
    fn update_permissions<'a>(
        &'a self,
        caller: Address,
        change: impl FnOnce(PermissionUpdate<'a, A>) -> PermissionUpdate<'a, A>,
    ) -> Result<(), KeyManagerError> {
        let store = self.permission_store()?;
        match change(store.update()).into_payload() {
            Some(payload) => self.execute(caller, &payload).map(drop),
            None => Ok(()),
        }
    }
}

/// Maps an account failure, decoding revert data raised by a nested key manager call.
fn bubble(error: AccountError) -> KeyManagerError {
    match error {
        AccountError::Reverted(data) => KeyManagerError::decode_revert(&data),
        error => error.into(),
    }
}

fn decode_call<C: SolCall>(calldata: &[u8]) -> Result<C, KeyManagerError> {
    C::abi_decode(calldata, true).map_err(|_| KeyManagerError::InvalidPayload)
}
