pub use avs_directory::IAVSDirectory;
pub use delegation_manager::{IDelegationManager, IDelegationManager::OperatorDetails};
pub use ecdsa_stake_registry::{
    ECDSAStakeRegistry, ECDSAStakeRegistry::SignatureWithSaltAndExpiry,
};
pub use hello_world_service_manager::HelloWorldServiceManager;

mod delegation_manager {
    alloy_sol_types::sol! {
        #[allow(missing_docs)]
        #[derive(Debug)]
        #[sol(rpc)]
        interface IDelegationManager {
            struct OperatorDetails {
                address earningsReceiver;
                address delegationApprover;
                uint32 stakerOptOutWindowBlocks;
            }

            function registerAsOperator(
                OperatorDetails calldata registeringOperatorDetails,
                string calldata metadataURI
            ) external;

            function isOperator(address operator) external view returns (bool);
        }
    }
}

mod avs_directory {
    alloy_sol_types::sol! {
        #[allow(missing_docs)]
        #[derive(Debug)]
        #[sol(rpc)]
        interface IAVSDirectory {
            function calculateOperatorAVSRegistrationDigestHash(
                address operator,
                address avs,
                bytes32 salt,
                uint256 expiry
            ) external view returns (bytes32);

            function operatorSaltIsSpent(address operator, bytes32 salt) external view returns (bool);
        }
    }
}

mod ecdsa_stake_registry {
    alloy_sol_types::sol! {
        #[allow(missing_docs)]
        #[derive(Debug)]
        #[sol(rpc)]
        interface ECDSAStakeRegistry {
            struct SignatureWithSaltAndExpiry {
                bytes signature;
                bytes32 salt;
                uint256 expiry;
            }

            function registerOperatorWithSignature(
                SignatureWithSaltAndExpiry memory _operatorSignature,
                address _operator
            ) external;

            function operatorRegistered(address _operator) external view returns (bool);

            function isValidSignature(
                bytes32 _dataHash,
                bytes memory _signatureData
            ) external view returns (bytes4);
        }
    }
}

mod hello_world_service_manager {
    alloy_sol_types::sol! {
        #[allow(missing_docs)]
        #[derive(Debug)]
        #[sol(rpc)]
        interface HelloWorldServiceManager {
            struct Task {
                string name;
                uint32 taskCreatedBlock;
            }

            event NewTaskCreated(uint32 indexed taskIndex, Task task);

            function latestTaskNum() external view returns (uint32);
        }
    }
}
