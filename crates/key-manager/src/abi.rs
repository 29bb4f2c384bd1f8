//! Solidity bindings of the interfaces the key manager speaks.

use alloy_sol_types::sol;

sol! {
    /// The ERC725 account functions the key manager authorizes and forwards.
    ///
    /// Any other selector sent through `execute(bytes)` is rejected.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC725 {
        function setData(bytes32 dataKey, bytes dataValue) external payable;
        function setDataBatch(bytes32[] dataKeys, bytes[] dataValues) external payable;
        function execute(uint256 operationType, address target, uint256 value, bytes data) external payable returns (bytes);
        function executeBatch(uint256[] operationsType, address[] targets, uint256[] values, bytes[] datas) external payable returns (bytes[]);
        function transferOwnership(address newOwner) external;
        function renounceOwnership() external;
    }
}

sol! {
    /// The external interface of the key manager.
    #[derive(Debug, PartialEq, Eq)]
    interface ILSP6KeyManager {
        function target() external view returns (address);
        function execute(bytes payload) external payable returns (bytes);
        function executeRelayCall(bytes signature, uint256 nonce, uint256 validityTimestamps, bytes payload) external payable returns (bytes);
        function getNonce(address from, uint128 channelId) external view returns (uint256);
        function isValidSignature(bytes32 dataHash, bytes signature) external view returns (bytes4);

        error NoPermissionsSet(address from);
        error NotAuthorised(address from, string permission);
        error NotAllowedCall(address from, address to, bytes4 selector);
        error NotAllowedERC725YDataKey(address from, bytes32 disallowedKey);
        error NotRecognisedPermissionKey(bytes32 dataKey);
        error InvalidDataValuesForDataKeys(bytes32 dataKey, bytes dataValue);
        error InvalidEncodedAllowedCalls(bytes allowedCallsValue);
        error InvalidEncodedAllowedERC725YDataKeys(bytes value);
        error InvalidERC725Function(bytes4 invalidFunction);
        error InvalidPayload();
        error BatchLengthMismatch();
        error InvalidOperationType(uint256 operationType);
        error InvalidRelayNonce(address signer, uint256 invalidNonce, bytes signature);
        error InvalidRelaySignature();
        error RelayCallBeforeStartTime();
        error RelayCallExpired();
        error ReentrantCall();
        error NotInitialized();
        error AlreadyInitialized();
        error AccountCallFailed(bytes reason);
    }
}
